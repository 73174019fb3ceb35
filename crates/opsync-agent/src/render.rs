//! ---
//! opsync_section: "05-agent-runtime"
//! opsync_subsection: "module"
//! opsync_type: "source"
//! opsync_scope: "code"
//! opsync_description: "Human-readable log rendering of configuration and triggers."
//! opsync_version: "v0.1.0"
//! opsync_owner: "tbd"
//! ---
use opsync_remote::Trigger;
use serde_json::Value;
use tracing::info;

pub const EMPTY_MARKER: &str = "\t* empty *";

/// One line per entry, in the iterator's order, or the empty marker.
pub fn configuration_lines<'a, I>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let lines: Vec<String> = entries
        .into_iter()
        .map(|(key, value)| format!("\t{key}\t=> {value}"))
        .collect();
    if lines.is_empty() {
        vec![EMPTY_MARKER.to_string()]
    } else {
        lines
    }
}

pub fn trigger_lines(trigger: &Trigger) -> Vec<String> {
    vec![
        format!("\tId: {}", trigger.id),
        format!("\tType: {}", trigger.kind),
        format!("\tReason: {}", trigger.reason),
        format!("\tLink: {}", trigger.link),
        format!("\tTriggered at: {}", trigger.triggered_at),
        format!("\tTriggered by: {}", trigger.triggered_by),
        format!("\tParameters: {}", trigger.parameters),
    ]
}

/// Emit a titled block of configuration lines at `info`.
pub fn log_configuration<'a, I>(title: &str, cluster: &str, entries: I)
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    info!(cluster, "{title}");
    for line in configuration_lines(entries) {
        info!(cluster, "{line}");
    }
}

pub fn log_trigger(cluster: &str, trigger: &Trigger) {
    for line in trigger_lines(trigger) {
        info!(cluster, trigger_id = trigger.id, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsync_store::ConfigStore;
    use serde_json::json;

    #[test]
    fn renders_sorted_entries() {
        let store = ConfigStore::from_delta(
            serde_json::from_value(json!({"zeta": "z", "alpha": 1, "list": [1, 2]})).unwrap(),
        );
        let snapshot = store.snapshot();
        assert_eq!(
            configuration_lines(snapshot.iter()),
            vec![
                "\talpha\t=> 1".to_string(),
                "\tlist\t=> [1,2]".to_string(),
                "\tzeta\t=> \"z\"".to_string(),
            ]
        );
    }

    #[test]
    fn renders_empty_marker() {
        let snapshot = ConfigStore::new().snapshot();
        assert_eq!(configuration_lines(snapshot.iter()), vec![EMPTY_MARKER]);
    }

    #[test]
    fn renders_trigger_details() {
        let mut trigger = Trigger::new(12);
        trigger.kind = "must-gather".into();
        trigger.triggered_by = "ops".into();

        let lines = trigger_lines(&trigger);
        assert_eq!(lines[0], "\tId: 12");
        assert_eq!(lines[1], "\tType: must-gather");
        assert_eq!(lines[5], "\tTriggered by: ops");
        assert_eq!(lines.len(), 7);
    }
}
