//! Job submission.
//!
//! Operators trigger processing jobs by name. Each known start command maps
//! to a workflow; the request arguments are validated against the command
//! and the resulting workflow message is handed to the configured publisher.
//! The message queue itself is an external collaborator behind the
//! [`JobPublisher`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Exchange and routing key for workflow requests.
pub const WORKFLOW_EXCHANGE: &str = "workflow";
pub const WORKFLOW_REQUEST_KEY: &str = "workflow.request";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("missing required argument {0:?}")]
    MissingArgument(String),
    #[error("publish failed: {0}")]
    Publish(String),
}

/// One argument accepted by a start command.
#[derive(Debug, Clone)]
pub struct JobArg {
    pub name: &'static str,
    pub required: bool,
}

/// A named, startable workflow.
#[derive(Debug, Clone)]
pub struct StartCommand {
    pub workflow: &'static str,
    pub start_step: Option<&'static str>,
    pub args: Vec<JobArg>,
}

/// The catalog of start commands operators may trigger.
#[derive(Debug, Clone)]
pub struct StartCommands {
    commands: BTreeMap<&'static str, StartCommand>,
}

impl Default for StartCommands {
    fn default() -> Self {
        let required = |name| JobArg { name, required: true };
        let optional = |name| JobArg {
            name,
            required: false,
        };
        let mut commands = BTreeMap::new();
        commands.insert(
            "import",
            StartCommand {
                workflow: "import",
                start_step: None,
                args: vec![
                    required("catalogue"),
                    required("collection"),
                    optional("application"),
                ],
            },
        );
        commands.insert(
            "export",
            StartCommand {
                workflow: "export",
                start_step: None,
                args: vec![
                    required("catalogue"),
                    required("collection"),
                    optional("destination"),
                ],
            },
        );
        commands.insert(
            "relate",
            StartCommand {
                workflow: "relate",
                start_step: Some("prepare"),
                args: vec![required("catalogue"), optional("collection")],
            },
        );
        Self { commands }
    }
}

impl StartCommands {
    pub fn get(&self, name: &str) -> Option<&StartCommand> {
        self.commands.get(name)
    }
}

/// Destination for workflow messages.
pub trait JobPublisher: Send + Sync {
    fn publish(&self, exchange: &str, key: &str, msg: &Value) -> Result<(), JobError>;
}

/// Publisher used when no message queue is wired in; it only logs the
/// message. Keeps local development and tests independent of a broker.
#[derive(Debug, Default)]
pub struct LoggingPublisher;

impl JobPublisher for LoggingPublisher {
    fn publish(&self, exchange: &str, key: &str, msg: &Value) -> Result<(), JobError> {
        tracing::info!(exchange, key, message = %msg, "workflow message published");
        Ok(())
    }
}

/// Builds and publishes workflow jobs.
pub struct JobHandler {
    commands: StartCommands,
    publisher: Arc<dyn JobPublisher>,
}

impl JobHandler {
    pub fn new(publisher: Arc<dyn JobPublisher>) -> Self {
        Self {
            commands: StartCommands::default(),
            publisher,
        }
    }

    /// Validate the request against the named start command and publish the
    /// workflow message. Returns the message so the caller can echo its
    /// header back.
    pub fn publish_job(&self, action: &str, request: &Value) -> Result<Value, JobError> {
        let command = self
            .commands
            .get(action)
            .ok_or_else(|| JobError::UnknownAction(action.to_string()))?;
        let header = self.extract_args(command, request)?;

        let mut workflow = Map::new();
        workflow.insert("workflow_name".into(), json!(command.workflow));
        if let Some(step) = command.start_step {
            workflow.insert("step_name".into(), json!(step));
        }
        let msg = json!({
            "workflow": Value::Object(workflow),
            "header": header,
        });

        self.publisher
            .publish(WORKFLOW_EXCHANGE, WORKFLOW_REQUEST_KEY, &msg)?;
        Ok(msg)
    }

    /// Collect the command's arguments plus the `user` claim from the
    /// request body. Required arguments must be present.
    fn extract_args(&self, command: &StartCommand, request: &Value) -> Result<Value, JobError> {
        let mut header = Map::new();
        for arg in &command.args {
            match request.get(arg.name) {
                Some(value) if !value.is_null() => {
                    header.insert(arg.name.to_string(), value.clone());
                }
                _ if arg.required => {
                    return Err(JobError::MissingArgument(arg.name.to_string()));
                }
                _ => {}
            }
        }
        if let Some(user) = request.get("user") {
            if !user.is_null() {
                header.insert("user".into(), user.clone());
            }
        }
        Ok(Value::Object(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String, Value)>>,
    }

    impl JobPublisher for RecordingPublisher {
        fn publish(&self, exchange: &str, key: &str, msg: &Value) -> Result<(), JobError> {
            self.published.lock().unwrap().push((
                exchange.to_string(),
                key.to_string(),
                msg.clone(),
            ));
            Ok(())
        }
    }

    #[test]
    fn test_publish_job() {
        let publisher = Arc::new(RecordingPublisher::default());
        let handler = JobHandler::new(publisher.clone());

        let msg = handler
            .publish_job(
                "import",
                &json!({
                    "catalogue": "meetbouten",
                    "collection": "metingen",
                    "user": "jan",
                    "unrelated": "dropped",
                }),
            )
            .unwrap();

        assert_eq!(msg["workflow"]["workflow_name"], "import");
        assert_eq!(msg["header"]["catalogue"], "meetbouten");
        assert_eq!(msg["header"]["user"], "jan");
        assert!(msg["header"].get("unrelated").is_none());

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, WORKFLOW_EXCHANGE);
        assert_eq!(published[0].1, WORKFLOW_REQUEST_KEY);
    }

    #[test]
    fn test_start_step_is_included_when_set() {
        let handler = JobHandler::new(Arc::new(RecordingPublisher::default()));
        let msg = handler
            .publish_job("relate", &json!({ "catalogue": "nap" }))
            .unwrap();
        assert_eq!(msg["workflow"]["step_name"], "prepare");
    }

    #[test]
    fn test_unknown_action() {
        let handler = JobHandler::new(Arc::new(RecordingPublisher::default()));
        let err = handler.publish_job("frobnicate", &json!({})).unwrap_err();
        assert!(matches!(err, JobError::UnknownAction(_)));
    }

    #[test]
    fn test_missing_required_argument() {
        let handler = JobHandler::new(Arc::new(RecordingPublisher::default()));
        let err = handler
            .publish_job("import", &json!({ "catalogue": "nap" }))
            .unwrap_err();
        assert!(matches!(err, JobError::MissingArgument(ref a) if a == "collection"));
    }
}
