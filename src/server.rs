//! JSON-lines request/response loop.
//!
//! One request object per input line, one response object per output line:
//!
//! ```text
//! -> {"id": 1, "method": "instruction", "params": {"instruction": "tap at 10 20"}}
//! <- {"id": 1, "result": {"success": true, "timestamp": "..."}}
//! ```

use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::PipelineError;
use crate::orchestrator::InstructionPipeline;

pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Response {
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
        }
    }
}

pub struct StdioServer<'a> {
    pipeline: &'a InstructionPipeline,
}

impl<'a> StdioServer<'a> {
    pub fn new(pipeline: &'a InstructionPipeline) -> Self {
        Self { pipeline }
    }

    /// Serve stdin/stdout until stdin closes
    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        info!("Serving instructions on stdio");
        self.serve(stdin, stdout).await?;
        info!("Input closed, shutting down");
        self.pipeline.orchestrator().dispose().await;
        Ok(())
    }

    /// Request loop over any line source and sink. Bad requests get an error
    /// response; only I/O errors end the loop.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("<- {}", line);

            let response = self.handle(line).await;
            let out = serde_json::to_string(&response)?;
            debug!("-> {}", out);

            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok(())
    }

    pub async fn handle(&self, message: &str) -> Response {
        let request: Request = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed request: {}", e);
                return Response::error(None, INVALID_PARAMS, format!("Malformed request: {}", e));
            }
        };
        let id = request.id.clone();

        match self.dispatch(&request).await {
            Ok(result) => Response::success(id, result),
            Err((code, message)) => Response::error(id, code, message),
        }
    }

    async fn dispatch(&self, request: &Request) -> std::result::Result<Value, (i32, String)> {
        let params = &request.params;
        match request.method.as_str() {
            "instruction" => {
                let text = params
                    .get("instruction")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("params.instruction must be a string"))?;
                let result = self.pipeline.process(text).await;
                to_value(&result)
            }
            "listCommands" => to_value(&self.pipeline.parser().registry().list_supported()),
            "suggest" => {
                let partial = match params.get("partial") {
                    None | Some(Value::Null) => "",
                    Some(Value::String(partial)) => partial.as_str(),
                    Some(_) => return Err(invalid("params.partial must be a string")),
                };
                Ok(json!(self.pipeline.parser().registry().suggest(partial)))
            }
            "history" => {
                let limit = match params.get("limit") {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(
                        value
                            .as_u64()
                            .ok_or_else(|| invalid("params.limit must be a non-negative integer"))?
                            as usize,
                    ),
                };
                to_value(&self.pipeline.orchestrator().get_command_history(limit))
            }
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }
}

fn invalid(message: &str) -> (i32, String) {
    let error = PipelineError::InvalidRequest {
        message: message.to_string(),
    };
    (INVALID_PARAMS, error.to_string())
}

fn to_value<T: Serialize>(value: &T) -> std::result::Result<Value, (i32, String)> {
    serde_json::to_value(value).map_err(|e| (INVALID_PARAMS, format!("Serialization error: {}", e)))
}
