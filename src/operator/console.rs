//! Operator console contract and a line-based terminal implementation.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use zeroize::Zeroizing;

use crate::error::{Result, SiphonError};

/// Request/response interface to the human operator
#[async_trait]
pub trait OperatorConsole: Send {
    /// Show a message; no answer expected
    async fn notify(&mut self, message: &str) -> Result<()>;

    /// Present `options` and return the index of the chosen one
    async fn select(&mut self, title: &str, options: &[String]) -> Result<usize>;

    /// Free-text answer, trimmed
    async fn prompt(&mut self, message: &str) -> Result<String>;

    /// Secret answer such as a keystore password
    async fn prompt_secret(&mut self, message: &str) -> Result<Zeroizing<String>>;

    /// Explicit yes; anything else aborts
    async fn confirm(&mut self, message: &str) -> Result<bool>;
}

/// Numbered-menu console over any async line reader and writer.
///
/// Secrets keep every character except the line terminator. [`StdioConsole::stdio`]
/// reads them from the terminal with echo disabled.
///
/// ```rust
/// use orchestrator_siphon::operator::{OperatorConsole, StdioConsole};
///
/// # tokio_test::block_on(async {
/// let mut console = StdioConsole::new(&b"2\n"[..], Vec::new());
/// let options = vec!["Treasury proposals".to_string(), "Set commission rates".to_string()];
/// assert_eq!(console.select("Interactive mode", &options).await.unwrap(), 1);
/// # });
/// ```
pub struct StdioConsole<R, W> {
    reader: R,
    writer: W,
    secrets: SecretInput,
}

/// Where `prompt_secret` reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretInput {
    /// The controlling terminal, with echo disabled
    Terminal,
    /// The console's own reader
    Reader,
}

impl StdioConsole<BufReader<Stdin>, Stdout> {
    /// Terminal console; secrets are read without echo
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .with_secret_input(SecretInput::Terminal)
    }
}

/// Drop a single trailing line terminator, keeping every other character
fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(line)
}

async fn read_terminal_secret() -> Result<Zeroizing<String>> {
    let password = tokio::task::spawn_blocking(|| rpassword::read_password().map(Zeroizing::new))
        .await
        .map_err(|e| SiphonError::Operator(e.to_string()))?
        .map_err(|e| SiphonError::Operator(format!("unable to read password: {e}")))?;
    Ok(Zeroizing::new(strip_line_ending(&password).to_string()))
}

impl<R, W> StdioConsole<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Console over arbitrary streams; secrets are read from `reader`
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            secrets: SecretInput::Reader,
        }
    }

    pub fn with_secret_input(mut self, secrets: SecretInput) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(|e| SiphonError::Operator(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SiphonError::Operator(e.to_string()))
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| SiphonError::Operator(e.to_string()))?;
        if read == 0 {
            return Err(SiphonError::Operator("operator input closed".to_string()));
        }
        Ok(line.trim().to_string())
    }

    async fn read_secret_line(&mut self) -> Result<Zeroizing<String>> {
        let mut line = Zeroizing::new(String::with_capacity(256));
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| SiphonError::Operator(e.to_string()))?;
        if read == 0 {
            return Err(SiphonError::Operator("operator input closed".to_string()));
        }
        Ok(Zeroizing::new(strip_line_ending(&line).to_string()))
    }
}

#[async_trait]
impl<R, W> OperatorConsole for StdioConsole<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn notify(&mut self, message: &str) -> Result<()> {
        self.write(&format!("{message}\n")).await
    }

    async fn select(&mut self, title: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            return Err(SiphonError::Validation("menu has no options".to_string()));
        }

        loop {
            let mut menu = format!("\n{title}\n");
            for (idx, option) in options.iter().enumerate() {
                menu.push_str(&format!("{}. {option}\n", idx + 1));
            }
            menu.push_str("\nEnter a number: ");
            self.write(&menu).await?;

            match self.read_line().await?.parse::<usize>() {
                Ok(choice) if (1..=options.len()).contains(&choice) => return Ok(choice - 1),
                _ => {
                    self.write("Invalid input. Please enter a valid number.\n")
                        .await?
                }
            }
        }
    }

    async fn prompt(&mut self, message: &str) -> Result<String> {
        self.write(message).await?;
        self.read_line().await
    }

    async fn prompt_secret(&mut self, message: &str) -> Result<Zeroizing<String>> {
        self.write(message).await?;
        match self.secrets {
            SecretInput::Terminal => read_terminal_secret().await,
            SecretInput::Reader => self.read_secret_line().await,
        }
    }

    async fn confirm(&mut self, message: &str) -> Result<bool> {
        self.write(&format!(
            "{message}\nEnter 1 to confirm. Enter anything else to abort.\n"
        ))
        .await?;
        Ok(self.read_line().await? == "1")
    }
}
