use regex::Regex;

use crate::config::MatchMode;
use crate::error::Result;
use crate::models::ProcessRecord;
use crate::services::process_table::ProcessTable;

/// 针对一次查询构造的匹配规则
#[derive(Debug, Clone)]
pub enum MatchRule {
    /// `ps aux | grep <name>` then the filter token decides
    Filter { name: String, filter: String },
    /// `tasklist | find <name>`; the name alone decides
    Name { name: String },
    /// name pre-filter, then a regular expression over the whole line
    Pattern { name: String, pattern: Regex },
}

impl MatchRule {
    pub fn new(mode: MatchMode, name: &str, filter: &str) -> Self {
        match mode {
            MatchMode::Filter => MatchRule::Filter {
                name: name.to_string(),
                filter: filter.to_string(),
            },
            MatchMode::Name => MatchRule::Name {
                name: name.to_string(),
            },
            MatchMode::Regex => match Regex::new(filter) {
                Ok(pattern) => MatchRule::Pattern {
                    name: name.to_string(),
                    pattern,
                },
                // 正则无效时退回字符串匹配
                Err(e) => {
                    log::warn!("Invalid filter pattern '{}', matching it literally: {}", filter, e);
                    MatchRule::Filter {
                        name: name.to_string(),
                        filter: filter.to_string(),
                    }
                }
            },
        }
    }

    pub fn is_match(&self, record: &ProcessRecord) -> bool {
        match self {
            MatchRule::Filter { name, filter } => record.contains(name) && record.contains(filter),
            MatchRule::Name { name } => record.contains(name),
            MatchRule::Pattern { name, pattern } => {
                record.contains(name) && pattern.is_match(&record.line)
            }
        }
    }
}

/// 在进程表中查找目标进程
pub struct ProcessMatcher<T> {
    table: T,
    mode: MatchMode,
    own_pid: u32,
}

impl<T: ProcessTable> ProcessMatcher<T> {
    pub fn new(table: T, mode: MatchMode) -> Self {
        Self {
            table,
            mode,
            own_pid: std::process::id(),
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// 获取所有匹配的进程
    ///
    /// The supervisor's own process is never returned: its command line
    /// carries the very tokens it is looking for.
    pub fn find(&self, name: &str, filter: &str) -> Result<Vec<ProcessRecord>> {
        let rule = MatchRule::new(self.mode, name, filter);
        let matches: Vec<ProcessRecord> = self
            .table
            .snapshot()?
            .into_iter()
            .filter(|record| record.pid != Some(self.own_pid))
            .filter(|record| rule.is_match(record))
            .collect();

        log::debug!(
            "Found {} process(es) matching name='{}' filter='{}' ({:?})",
            matches.len(),
            name,
            filter,
            self.mode
        );
        Ok(matches)
    }
}
