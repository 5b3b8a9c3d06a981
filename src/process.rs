//! Facts about the running process
//!
//! Every audit record carries a [`ProcessData`] describing who produced it:
//! pid, owner, host, program name and arguments, start time, and the
//! interlink id that ties records of one process invocation together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, Users};
use tracing::debug;

use crate::config::Config;

/// Placeholder for facts the OS would not give us
const UNKNOWN: &str = "unknown";

/// Process fact record stored alongside audit events
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProcessData {
    pub interlink_id: String,
    pub user: String,
    pub pid: u32,
    pub machine: String,
    pub name: String,
    pub args: String,
    pub creation_time: DateTime<Utc>,
}

/// Raw facts read from the operating system
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessFacts {
    pub pid: u32,
    pub user: Option<String>,
    pub machine: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub argv: Vec<String>,
}

/// Source of process facts
pub trait ProcessInspector {
    fn facts(&self) -> ProcessFacts;
}

/// Reads facts about the current process through `sysinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInspector;

impl ProcessInspector for SystemInspector {
    fn facts(&self) -> ProcessFacts {
        let argv = std::env::args_os()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        let mut facts = ProcessFacts {
            pid: std::process::id(),
            machine: System::host_name(),
            argv,
            ..Default::default()
        };

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                debug!(error = e, "current pid not visible to sysinfo");
                return facts;
            }
        };

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );

        if let Some(process) = system.process(pid) {
            facts.start_time = DateTime::from_timestamp(process.start_time() as i64, 0);
            facts.user = process.user_id().and_then(|uid| {
                let users = Users::new_with_refreshed_list();
                users.get_user_by_id(uid).map(|user| user.name().to_string())
            });
        }

        facts
    }
}

/// Collect process data for the current process
pub fn extract_process_data(interlink_id: &str, config: &Config) -> ProcessData {
    extract_process_data_with(&SystemInspector, interlink_id, config)
}

/// Collect process data from an explicit inspector
pub fn extract_process_data_with<P>(inspector: &P, interlink_id: &str, config: &Config) -> ProcessData
where
    P: ProcessInspector + ?Sized,
{
    let facts = inspector.facts();
    let (name, args) = split_invocation(&facts.argv, &config.launcher_scripts);

    ProcessData {
        interlink_id: interlink_id.to_string(),
        user: facts.user.unwrap_or_else(|| UNKNOWN.to_string()),
        pid: facts.pid,
        machine: facts.machine.unwrap_or_else(|| UNKNOWN.to_string()),
        name,
        args,
        creation_time: facts.start_time.unwrap_or_else(Utc::now),
    }
}

/// Split argv into a display name and a space joined argument string
///
/// A leading launcher script (`manage.py`) is skipped so the command it
/// runs becomes the name.
pub fn split_invocation(argv: &[String], launchers: &[String]) -> (String, String) {
    let rest = match argv.split_first() {
        Some((first, rest)) if is_launcher(first, launchers) && !rest.is_empty() => rest,
        Some(_) => argv,
        None => return (UNKNOWN.to_string(), String::new()),
    };

    let name = rest[0].clone();
    let args = rest[1..].join(" ");
    (name, args)
}

fn is_launcher(arg: &str, launchers: &[String]) -> bool {
    let file_name = Path::new(arg)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(arg);
    launchers.iter().any(|l| l == file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedInspector(ProcessFacts);

    impl ProcessInspector for FixedInspector {
        fn facts(&self) -> ProcessFacts {
            self.0.clone()
        }
    }

    fn inspector(argv: &[&str]) -> FixedInspector {
        FixedInspector(ProcessFacts {
            pid: 1,
            user: Some("Username".to_string()),
            machine: Some("Machine".to_string()),
            start_time: DateTime::from_timestamp(1_400_000_000, 0),
            argv: argv.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_extract_process_data() {
        let data = extract_process_data_with(
            &inspector(&["foo", "b", "a", "r"]),
            "Interlink ID",
            &Config::new(),
        );

        assert_eq!(data.interlink_id, "Interlink ID");
        assert_eq!(data.user, "Username");
        assert_eq!(data.pid, 1);
        assert_eq!(data.machine, "Machine");
        assert_eq!(data.name, "foo");
        assert_eq!(data.args, "b a r");
        assert_eq!(data.creation_time.timestamp(), 1_400_000_000);
    }

    #[test]
    fn test_extract_process_data_launcher() {
        let data = extract_process_data_with(
            &inspector(&["manage.py", "foo", "b", "a", "r"]),
            "Interlink ID",
            &Config::new(),
        );

        assert_eq!(data.name, "foo");
        assert_eq!(data.args, "b a r");
    }

    #[test]
    fn test_launcher_matched_by_file_name() {
        let launchers = vec!["manage.py".to_string()];
        let argv: Vec<String> = ["/srv/app/manage.py", "migrate"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            split_invocation(&argv, &launchers),
            ("migrate".to_string(), String::new())
        );
    }

    #[test]
    fn test_lone_launcher_is_kept() {
        let launchers = vec!["manage.py".to_string()];
        let argv = vec!["manage.py".to_string()];

        assert_eq!(
            split_invocation(&argv, &launchers),
            ("manage.py".to_string(), String::new())
        );
    }

    #[test]
    fn test_custom_launchers() {
        let config = Config::new().with_launcher_scripts(["run-worker"]);
        let data = extract_process_data_with(&inspector(&["run-worker", "queue", "-v"]), "id", &config);

        assert_eq!(data.name, "queue");
        assert_eq!(data.args, "-v");
    }

    #[test]
    fn test_missing_facts_degrade() {
        let data = extract_process_data_with(&FixedInspector(ProcessFacts::default()), "id", &Config::new());

        assert_eq!(data.user, "unknown");
        assert_eq!(data.machine, "unknown");
        assert_eq!(data.name, "unknown");
        assert!(data.args.is_empty());
    }

    #[test]
    fn test_system_inspector_reads_current_process() {
        let facts = SystemInspector.facts();

        assert_eq!(facts.pid, std::process::id());
        assert!(!facts.argv.is_empty());
    }
}
