//! Amazon Transcribe streaming recognizer.

use crate::defaults;
use crate::error::{ParleyError, Result};
use crate::pipeline::types::AudioFrame;
use crate::stt::recognizer::{RecognitionEvent, Recognizer, TranscriptFragment};
use aws_config::SdkConfig;
use aws_sdk_transcribestreaming::Client;
use aws_sdk_transcribestreaming::error::DisplayErrorContext;
use aws_sdk_transcribestreaming::primitives::Blob;
use aws_sdk_transcribestreaming::types::error::AudioStreamError;
use aws_sdk_transcribestreaming::types::{
    AudioEvent, AudioStream, LanguageCode, MediaEncoding, TranscriptEvent, TranscriptResultStream,
};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio_stream::wrappers::UnboundedReceiverStream;

type AudioItem = std::result::Result<AudioStream, AudioStreamError>;

/// Recognizer backed by one Transcribe streaming session.
///
/// Audio is pushed into the request stream; result events are pumped by a
/// task on the runtime into a channel drained by [`Recognizer::poll_event`].
pub struct TranscribeRecognizer {
    audio_tx: Option<UnboundedSender<AudioItem>>,
    events: Receiver<Result<RecognitionEvent>>,
    closed: bool,
}

impl TranscribeRecognizer {
    /// Open the streaming session on `handle`.
    ///
    /// Connection failures surface through the first [`Recognizer::poll_event`].
    pub fn start(handle: &Handle, sdk_config: &SdkConfig, language: &str) -> Self {
        let client = Client::new(sdk_config);
        let (audio_tx, audio_rx) = unbounded_channel::<AudioItem>();
        let (event_tx, events) = unbounded();
        let language = LanguageCode::from(language);

        handle.spawn(async move {
            let started = client
                .start_stream_transcription()
                .language_code(language)
                .media_sample_rate_hertz(defaults::SAMPLE_RATE as i32)
                .media_encoding(MediaEncoding::Pcm)
                .audio_stream(UnboundedReceiverStream::new(audio_rx).into())
                .send()
                .await;

            let mut output = match started {
                Ok(output) => output,
                Err(e) => {
                    send_error(
                        &event_tx,
                        format!("Failed to start transcription: {}", DisplayErrorContext(&e)),
                    );
                    return;
                }
            };

            loop {
                match output.transcript_result_stream.recv().await {
                    Ok(Some(TranscriptResultStream::TranscriptEvent(event))) => {
                        if event_tx.send(Ok(to_recognition_event(&event))).is_err() {
                            break;
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        send_error(
                            &event_tx,
                            format!("Transcription stream failed: {}", DisplayErrorContext(&e)),
                        );
                        break;
                    }
                }
            }
        });

        Self {
            audio_tx: Some(audio_tx),
            events,
            closed: false,
        }
    }
}

fn send_error(tx: &Sender<Result<RecognitionEvent>>, message: String) {
    // The receiver is gone only after the orchestrator has stopped polling.
    tx.send(Err(ParleyError::Recognition { message })).ok();
}

/// Non-partial results contribute every alternative as a final fragment;
/// partial results contribute their first alternative.
fn to_recognition_event(event: &TranscriptEvent) -> RecognitionEvent {
    let Some(transcript) = event.transcript() else {
        return RecognitionEvent::NoResult;
    };

    let mut fragments = Vec::new();
    for result in transcript.results() {
        let texts = result
            .alternatives()
            .iter()
            .filter_map(|alt| alt.transcript());
        if result.is_partial() {
            fragments.extend(texts.take(1).map(TranscriptFragment::partial));
        } else {
            fragments.extend(texts.map(TranscriptFragment::final_text));
        }
    }
    RecognitionEvent::Transcript(fragments)
}

impl Recognizer for TranscribeRecognizer {
    fn send_audio(&mut self, frame: &AudioFrame) -> Result<()> {
        let Some(tx) = &self.audio_tx else {
            return Err(ParleyError::Recognition {
                message: "audio stream already finished".to_string(),
            });
        };
        let event = AudioEvent::builder()
            .audio_chunk(Blob::new(frame.pcm_bytes()))
            .build();
        tx.send(Ok(AudioStream::AudioEvent(event)))
            .map_err(|_| ParleyError::Recognition {
                message: "transcription stream is closed".to_string(),
            })
    }

    fn poll_event(&mut self) -> Result<Option<RecognitionEvent>> {
        if self.closed {
            return Ok(Some(RecognitionEvent::Closed));
        }
        match self.events.try_recv() {
            Ok(event) => event.map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                Ok(Some(RecognitionEvent::Closed))
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        // Dropping the sender ends the request stream.
        self.audio_tx = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_transcribestreaming::types::{Alternative, Transcript, TranscriptResult};

    fn result(partial: bool, alternatives: &[&str]) -> TranscriptResult {
        let mut builder = TranscriptResult::builder().is_partial(partial);
        for text in alternatives {
            builder = builder.alternatives(Alternative::builder().transcript(*text).build());
        }
        builder.build()
    }

    fn event(results: Vec<TranscriptResult>) -> TranscriptEvent {
        TranscriptEvent::builder()
            .transcript(Transcript::builder().set_results(Some(results)).build())
            .build()
    }

    #[test]
    fn test_final_result_yields_every_alternative() {
        let event = event(vec![result(false, &["hello there", "hello their"])]);
        assert_eq!(
            to_recognition_event(&event),
            RecognitionEvent::Transcript(vec![
                TranscriptFragment::final_text("hello there"),
                TranscriptFragment::final_text("hello their"),
            ])
        );
    }

    #[test]
    fn test_partial_result_yields_first_alternative() {
        let event = event(vec![result(true, &["hel", "hell"])]);
        assert_eq!(
            to_recognition_event(&event),
            RecognitionEvent::Transcript(vec![TranscriptFragment::partial("hel")])
        );
    }

    #[test]
    fn test_empty_results_are_an_empty_set() {
        assert_eq!(
            to_recognition_event(&event(Vec::new())),
            RecognitionEvent::Transcript(Vec::new())
        );
    }

    #[test]
    fn test_missing_transcript_is_no_result() {
        let event = TranscriptEvent::builder().build();
        assert_eq!(to_recognition_event(&event), RecognitionEvent::NoResult);
    }
}
