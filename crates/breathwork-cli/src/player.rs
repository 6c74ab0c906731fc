use std::sync::Arc;

use breathwork_core::{AudioLoader, Config, SilentLoader};

/// Pick the loader for this run. Without the `playback` feature, or with
/// `audio.enabled = false`, every track loads as silence.
pub fn loader(config: &Config) -> Arc<dyn AudioLoader> {
    if !config.audio.enabled {
        return Arc::new(SilentLoader);
    }

    #[cfg(feature = "playback")]
    {
        Arc::new(rodio_backend::RodioLoader::default())
    }
    #[cfg(not(feature = "playback"))]
    {
        tracing::debug!("built without the playback feature; audio is silent");
        Arc::new(SilentLoader)
    }
}

#[cfg(feature = "playback")]
mod rodio_backend {
    use std::io::Cursor;
    use std::sync::mpsc::{self, Sender};
    use std::thread;

    use async_trait::async_trait;
    use rodio::{Decoder, OutputStream, Sink, Source};
    use tokio::sync::oneshot;

    use breathwork_core::{AudioError, AudioHandle, AudioLoader, AudioTrack};

    enum PlayerCommand {
        Play,
        Pause,
        SetVolume(f32),
        Unload,
    }

    #[derive(Default)]
    pub struct RodioLoader {
        client: reqwest::Client,
    }

    impl RodioLoader {
        async fn fetch(&self, uri: &str) -> Result<Vec<u8>, AudioError> {
            let fetch_err = |message: String| AudioError::Fetch {
                uri: uri.to_string(),
                message,
            };

            if uri.starts_with("http://") || uri.starts_with("https://") {
                let response = self
                    .client
                    .get(uri)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| fetch_err(e.to_string()))?;
                let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
                Ok(bytes.to_vec())
            } else {
                let path = uri.strip_prefix("file://").unwrap_or(uri);
                tokio::fs::read(path)
                    .await
                    .map_err(|e| fetch_err(e.to_string()))
            }
        }
    }

    #[async_trait]
    impl AudioLoader for RodioLoader {
        async fn load(&self, track: &AudioTrack) -> Result<Box<dyn AudioHandle>, AudioError> {
            let bytes = self.fetch(&track.uri).await?;
            let uri = track.uri.clone();
            let (ready_tx, ready_rx) = oneshot::channel();
            let (tx, rx) = mpsc::channel::<PlayerCommand>();

            // OutputStream is not Send, so the thread owns it for the handle's lifetime.
            thread::Builder::new()
                .name("breathwork-audio".to_string())
                .spawn(move || {
                    let (_stream, stream_handle) = match OutputStream::try_default() {
                        Ok(pair) => pair,
                        Err(e) => {
                            let _ = ready_tx.send(Err(AudioError::OutputUnavailable(e.to_string())));
                            return;
                        }
                    };
                    let sink = match Sink::try_new(&stream_handle) {
                        Ok(sink) => sink,
                        Err(e) => {
                            let _ = ready_tx.send(Err(AudioError::OutputUnavailable(e.to_string())));
                            return;
                        }
                    };
                    let source = match Decoder::new(Cursor::new(bytes)) {
                        Ok(source) => source,
                        Err(e) => {
                            let _ = ready_tx.send(Err(AudioError::Decode {
                                uri,
                                message: e.to_string(),
                            }));
                            return;
                        }
                    };

                    sink.pause();
                    sink.append(source.repeat_infinite());
                    if ready_tx.send(Ok(())).is_err() {
                        return;
                    }

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            PlayerCommand::Play => sink.play(),
                            PlayerCommand::Pause => sink.pause(),
                            PlayerCommand::SetVolume(gain) => sink.set_volume(gain),
                            PlayerCommand::Unload => break,
                        }
                    }
                    sink.stop();
                })
                .map_err(|e| AudioError::OutputUnavailable(e.to_string()))?;

            match ready_rx.await {
                Ok(Ok(())) => Ok(Box::new(RodioHandle { tx: Some(tx) })),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(AudioError::OutputUnavailable(
                    "audio thread exited during setup".to_string(),
                )),
            }
        }
    }

    struct RodioHandle {
        tx: Option<Sender<PlayerCommand>>,
    }

    impl RodioHandle {
        fn send(&self, cmd: PlayerCommand) -> Result<(), AudioError> {
            let tx = self
                .tx
                .as_ref()
                .ok_or_else(|| AudioError::Playback("track already unloaded".to_string()))?;
            tx.send(cmd)
                .map_err(|_| AudioError::Playback("audio thread stopped".to_string()))
        }
    }

    impl AudioHandle for RodioHandle {
        fn play(&mut self) -> Result<(), AudioError> {
            self.send(PlayerCommand::Play)
        }

        fn pause(&mut self) -> Result<(), AudioError> {
            self.send(PlayerCommand::Pause)
        }

        fn set_volume(&mut self, gain: f32) -> Result<(), AudioError> {
            self.send(PlayerCommand::SetVolume(gain))
        }

        fn unload(&mut self) {
            if let Some(tx) = self.tx.take() {
                let _ = tx.send(PlayerCommand::Unload);
            }
        }
    }

    impl Drop for RodioHandle {
        fn drop(&mut self) {
            self.unload();
        }
    }
}
