//! Line-oriented terminal front end
//!
//! Plain lines go to the active mode; lines starting with `/` are commands.

use crate::documents::DocumentFile;
use crate::integration::{RejectReason, SendOutcome, SessionEvent, SessionOrchestrator};
use crate::llm::data_uri::decode_data_uri;
use crate::messages::{Message, Role};
use crate::speech::SpeechCapture;
use crate::ui::state::{DocumentPanel, ImagePanel, Tab};
use crate::{AlexError, Result};
use crossbeam_channel::Receiver;
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info, warn};

const HELP: &str = "\
Commands:
  /chat              Study Buddy: talk with Alex
  /doc               Document Summary
  /image             Picture Analyzer
  /open <path>       Pick a document or image for the current mode
  /summarize         Summarize the picked document
  /ask <question>    Ask about the picked image
  /listen            Dictate a message (press Enter to stop)
  /replay [id]       Speak a message again (default: Alex's last reply)
  /stop              Stop speaking
  /help              Show this help
  /quit              Exit";

/// What the input loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Listen,
    Quit,
}

pub struct App<W: Write> {
    orchestrator: Arc<SessionOrchestrator>,
    documents: DocumentPanel,
    images: ImagePanel,
    capture: SpeechCapture,
    events: Receiver<SessionEvent>,
    tab: Tab,
    image_dir: PathBuf,
    out: W,
}

impl<W: Write> App<W> {
    pub fn new(orchestrator: Arc<SessionOrchestrator>, capture: SpeechCapture, out: W) -> Self {
        let gateway = Arc::clone(orchestrator.gateway());
        let playback = orchestrator.playback().clone();
        Self {
            documents: DocumentPanel::new(Arc::clone(&gateway), playback.clone()),
            images: ImagePanel::new(gateway, playback),
            events: orchestrator.event_receiver(),
            orchestrator,
            capture,
            tab: Tab::default(),
            image_dir: std::env::temp_dir(),
            out,
        }
    }

    /// Where generated images are written
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn documents(&self) -> &DocumentPanel {
        &self.documents
    }

    pub fn images(&self) -> &ImagePanel {
        &self.images
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Greet, then read commands from stdin until `/quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.out, "Alex, your AI study buddy. Type /help for commands.")?;
        self.show_tab()?;

        self.orchestrator.initialize_greeting().await;
        self.render_events()?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.handle_line(&line).await? {
                Control::Continue => {}
                Control::Listen => self.listen(&mut lines).await?,
                Control::Quit => break,
            }
        }

        self.orchestrator.stop_speaking();
        info!("Input closed, exiting");
        Ok(())
    }

    /// Handle one line of input
    pub async fn handle_line(&mut self, line: &str) -> Result<Control> {
        let line = line.trim();

        if let Some(command) = line.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(name, arg)| (name, arg.trim()))
                .unwrap_or((command, ""));
            debug!("Command /{} {:?}", name, arg);

            match name {
                "chat" => self.switch_tab(Tab::Chat)?,
                "doc" | "document" => self.switch_tab(Tab::Document)?,
                "image" | "picture" => self.switch_tab(Tab::Image)?,
                "open" => self.open(arg).await?,
                "summarize" => self.summarize().await?,
                "ask" => self.ask(arg).await?,
                "listen" => return Ok(Control::Listen),
                "replay" => self.replay(arg)?,
                "stop" => self.orchestrator.stop_speaking(),
                "help" => writeln!(self.out, "{HELP}")?,
                "quit" | "exit" => return Ok(Control::Quit),
                _ => writeln!(self.out, "Unknown command /{name}. Type /help for the list.")?,
            }
            return Ok(Control::Continue);
        }

        match self.tab {
            Tab::Chat => self.send(line).await?,
            Tab::Image => self.ask(line).await?,
            Tab::Document => {
                if !line.is_empty() {
                    writeln!(self.out, "Use /open <file> and then /summarize.")?;
                }
            }
        }
        Ok(Control::Continue)
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        match self.orchestrator.send_user_text(text).await {
            SendOutcome::Replied { .. } | SendOutcome::Rejected(RejectReason::Empty) => {}
            SendOutcome::Rejected(RejectReason::Busy) => {
                writeln!(self.out, "Alex is still answering, please wait.")?;
            }
        }
        self.render_events()
    }

    fn switch_tab(&mut self, tab: Tab) -> Result<()> {
        self.tab = tab;
        self.show_tab()
    }

    fn show_tab(&mut self) -> Result<()> {
        writeln!(self.out, "== {} ==", self.tab.label())?;
        Ok(())
    }

    async fn open(&mut self, path: &str) -> Result<()> {
        if path.is_empty() {
            writeln!(self.out, "Usage: /open <path>")?;
            return Ok(());
        }

        match self.tab {
            Tab::Document => {
                if self.documents.select_file(DocumentFile::from_path(path)) {
                    writeln!(self.out, "Selected {path}. Type /summarize.")?;
                } else {
                    self.show_document_error()?;
                }
            }
            Tab::Image => {
                if self.images.select_image(path).await {
                    writeln!(self.out, "Selected {path}. Ask a question about it.")?;
                } else if let Some(error) = self.images.snapshot().error {
                    writeln!(self.out, "{error}")?;
                }
            }
            Tab::Chat => writeln!(self.out, "Switch to /doc or /image to pick a file.")?,
        }
        Ok(())
    }

    async fn summarize(&mut self) -> Result<()> {
        if self.documents.snapshot().file.is_none() {
            writeln!(self.out, "Pick a document first with /open <path>.")?;
            return Ok(());
        }

        writeln!(self.out, "Summarizing...")?;
        match self.documents.summarize().await {
            Some(summary) => writeln!(self.out, "Summary:\n{summary}")?,
            None => self.show_document_error()?,
        }
        Ok(())
    }

    fn show_document_error(&mut self) -> Result<()> {
        if let Some(error) = self.documents.snapshot().error {
            writeln!(self.out, "{error}")?;
        }
        Ok(())
    }

    async fn ask(&mut self, question: &str) -> Result<()> {
        if question.is_empty() {
            return Ok(());
        }
        if self.images.snapshot().image.is_none() {
            writeln!(self.out, "Pick an image first with /open <path>.")?;
            return Ok(());
        }

        self.images.set_prompt(question);
        writeln!(self.out, "Analyzing...")?;
        match self.images.analyze().await {
            Some(analysis) => writeln!(self.out, "Alex: {analysis}")?,
            None => {
                if let Some(error) = self.images.snapshot().error {
                    writeln!(self.out, "{error}")?;
                }
            }
        }
        Ok(())
    }

    fn replay(&mut self, id: &str) -> Result<()> {
        let message_id = if id.is_empty() {
            self.orchestrator
                .log()
                .snapshot()
                .into_iter()
                .rev()
                .find(|m| m.role == Role::Model)
                .map(|m| m.id)
        } else {
            Some(id.to_string())
        };

        match message_id {
            Some(id) if self.orchestrator.toggle_playback(&id) => {}
            _ => writeln!(self.out, "Nothing to replay.")?,
        }
        Ok(())
    }

    /// Dictate into the chat draft until the recognizer stops or Enter is pressed
    async fn listen(&mut self, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
        if self.tab != Tab::Chat {
            writeln!(self.out, "Dictation is available in {}.", Tab::Chat.label())?;
            return Ok(());
        }
        let Some(mut transcripts) = self.capture.start_listening() else {
            writeln!(self.out, "Voice input is not available.")?;
            return Ok(());
        };

        writeln!(self.out, "Listening... press Enter to stop.")?;
        loop {
            tokio::select! {
                update = transcripts.next() => match update {
                    Some(text) => {
                        write!(self.out, "\r> {text}")?;
                        self.out.flush()?;
                        self.orchestrator.set_draft(text);
                    }
                    None => break,
                },
                _ = lines.next_line() => self.capture.stop_listening(),
            }
        }
        writeln!(self.out)?;

        if !self.orchestrator.draft().trim().is_empty() {
            self.orchestrator.submit_draft().await;
            self.render_events()?;
        }
        Ok(())
    }

    /// Print everything the session appended since the last call
    pub fn render_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            let SessionEvent::MessageAppended(message) = event else {
                continue;
            };
            if message.role != Role::Model {
                continue;
            }

            writeln!(self.out, "Alex: {}", message.text)?;
            if message.has_image() {
                match self.save_image(&message) {
                    Ok(path) => writeln!(self.out, "  [image saved to {}]", path.display())?,
                    Err(e) => {
                        warn!("Could not save generated image: {}", e);
                        writeln!(self.out, "  [{}]", e.user_message())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn save_image(&self, message: &Message) -> Result<PathBuf> {
        let uri = message.image_url.as_deref().unwrap_or_default();
        let (mime_type, bytes) = decode_data_uri(uri).ok_or(AlexError::InvalidImageData)?;
        let path = image_path(&self.image_dir, &message.id, &mime_type);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

fn image_path(dir: &Path, message_id: &str, mime_type: &str) -> PathBuf {
    let extension = match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "img",
    };
    dir.join(format!("alex-{message_id}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_path_extension() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            image_path(dir, "abc", "image/jpeg"),
            PathBuf::from("/tmp/out/alex-abc.jpg")
        );
        assert_eq!(
            image_path(dir, "abc", "image/tiff"),
            PathBuf::from("/tmp/out/alex-abc.img")
        );
    }
}
