//! External embedding extractor invoked as a child process.

use std::io::Write;
use std::process::{Command, Stdio};

use rollcall_core::{Embedding, EmbeddingExtractor, ExtractError};

/// Spawns the configured extractor command, feeds it the image bytes on
/// stdin and parses a JSON array of float arrays from its stdout. One inner
/// array per detected face; `[]` when no face was found.
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn from_command(command: &[String]) -> Result<Self, ExtractError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ExtractError::Process("extractor command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl EmbeddingExtractor for CommandExtractor {
    fn extract(&self, image: &[u8]) -> Result<Vec<Embedding>, ExtractError> {
        tracing::debug!(program = %self.program, bytes = image.len(), "running extractor");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image)?;
            // stdin drops here, closing the pipe so the child sees EOF
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ExtractError::Process(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_embeddings(&output.stdout)
    }
}

fn parse_embeddings(bytes: &[u8]) -> Result<Vec<Embedding>, ExtractError> {
    let vectors: Vec<Vec<f32>> =
        serde_json::from_slice(bytes).map_err(|err| ExtractError::Malformed(err.to_string()))?;
    Ok(vectors.into_iter().map(Embedding::new).collect())
}
