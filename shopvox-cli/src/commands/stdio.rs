//! Line-oriented harness: one JSON request per stdin line, one response per stdout line.

use anyhow::Result;
use shopvox_core::{PredictOutcome, Predictor, PredictorConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub async fn run_stdio(config: PredictorConfig) -> Result<()> {
    let predictor = Predictor::setup(config).await?;
    info!("Reading requests from stdin");
    let answered = serve_lines(
        &predictor,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;
    info!("Stdin closed after {answered} requests");
    Ok(())
}

/// Answer every non-blank line of `input` in order, one at a time. Returns
/// the number of responses written.
///
/// Lines are read as raw bytes: a line that is not UTF-8 gets an error
/// envelope like any other malformed request.
pub(crate) async fn serve_lines<R, W>(
    predictor: &Predictor,
    mut input: R,
    mut output: W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut answered = 0;
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => predictor.predict_json(line.trim()).await,
            Err(e) => {
                warn!("Rejected request: line is not valid UTF-8 ({e})");
                PredictOutcome::failure(format!("malformed request: {e}")).to_wire()
            }
        };
        output.write_all(response.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        answered += 1;
        debug!("Answered request #{answered}");
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, sync::Arc};

    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use hound::{SampleFormat, WavSpec, WavWriter};
    use serde_json::Value;
    use shopvox_core::{AudioClip, Conversation, GenerationParams, InferencePipeline};

    use super::*;

    /// Echoes the user's command back as the assistant message.
    struct EchoPipeline;

    #[async_trait]
    impl InferencePipeline for EchoPipeline {
        fn model_id(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            conversation: &Conversation,
            _audio: AudioClip,
            _params: &GenerationParams,
        ) -> anyhow::Result<String> {
            let command = &conversation.turns().last().unwrap().content;
            Ok(format!(
                r#"<|assistant|>{{"message": "you said {command}", "action": "search", "query": "{command}"}}"#
            ))
        }
    }

    fn wav_base64() -> String {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut buffer: Vec<u8> = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
            for i in 0..1600 {
                writer
                    .write_sample(((i as f32 * 0.1).sin() * 4000.0) as i16)
                    .unwrap();
            }
            writer.finalize().unwrap();
        }
        STANDARD.encode(buffer)
    }

    fn predictor() -> Predictor {
        Predictor::new(Arc::new(EchoPipeline), PredictorConfig::default()).unwrap()
    }

    fn request(command: &str, audio: &str) -> String {
        serde_json::json!({"command": command, "audio": audio}).to_string()
    }

    #[tokio::test]
    async fn answers_each_line_in_order() {
        let audio = wav_base64();
        let input = format!(
            "{}\n\n   \n{}\n",
            request("shoes", &audio),
            request("hats", &audio)
        );
        let mut output = Vec::new();
        let answered = serve_lines(&predictor(), input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(answered, 2);

        let output = String::from_utf8(output).unwrap();
        let responses: Vec<&str> = output.lines().collect();
        assert_eq!(
            responses,
            [
                r#"{"message": "you said shoes", "action": "search", "query": "shoes", "handle": null}"#,
                r#"{"message": "you said hats", "action": "search", "query": "hats", "handle": null}"#,
            ]
        );
    }

    #[tokio::test]
    async fn bad_lines_get_error_envelopes_and_do_not_stop_the_loop() {
        let audio = wav_base64();
        let input = format!(
            "not json\n{}\n{}\n",
            request("socks", "%%%"),
            request("socks", &audio)
        );
        let mut output = Vec::new();
        let answered = serve_lines(&predictor(), input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(answered, 3);

        let output = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        for failed in &responses[..2] {
            let fields = failed.as_object().unwrap();
            assert_eq!(fields.len(), 1);
            assert!(fields["message"].as_str().unwrap().starts_with("Error: "));
        }
        assert_eq!(responses[2]["query"], "socks");
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_answered_and_the_loop_continues() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(request("boots", &wav_base64()).as_bytes());
        input.push(b'\n');
        let mut output = Vec::new();
        let answered = serve_lines(&predictor(), &input[..], &mut output)
            .await
            .unwrap();
        assert_eq!(answered, 2);

        let output = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        let rejected = responses[0].as_object().unwrap();
        assert_eq!(rejected.len(), 1);
        assert!(rejected["message"]
            .as_str()
            .unwrap()
            .starts_with("Error: malformed request"));
        assert_eq!(responses[1]["message"], "you said boots");
    }

    #[tokio::test]
    async fn last_line_without_newline_is_answered() {
        let input = request("scarves", &wav_base64());
        let mut output = Vec::new();
        let answered = serve_lines(&predictor(), input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(answered, 1);
        assert!(String::from_utf8(output).unwrap().ends_with("}\n"));
    }

    #[tokio::test]
    async fn empty_input_answers_nothing() {
        let mut output = Vec::new();
        let answered = serve_lines(&predictor(), &b""[..], &mut output)
            .await
            .unwrap();
        assert_eq!(answered, 0);
        assert!(output.is_empty());
    }
}
