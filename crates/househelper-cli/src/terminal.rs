use std::io;

use househelper_core::auth::{
    ConfirmPrompt, IdentityProvider, PlatformError, PlatformUi, UserProfile,
};
use tokio::task;

/// Identity provider that asks the user to paste a login code issued by the mini program.
#[derive(Debug, Clone, Default)]
pub struct TerminalIdentity;

impl IdentityProvider for TerminalIdentity {
    async fn auth_code(&self) -> Result<String, PlatformError> {
        prompt_line("Paste the login code issued by WeChat: ")
            .await
            .map_err(|err| PlatformError::new(err.to_string()))
    }

    async fn user_profile(&self) -> Result<UserProfile, PlatformError> {
        let nick_name = prompt_line("Nickname to share (blank to skip): ")
            .await
            .map_err(|err| PlatformError::new(err.to_string()))?;
        if nick_name.is_empty() {
            return Ok(UserProfile::default());
        }
        Ok(UserProfile::with_nick_name(nick_name))
    }
}

/// Prompts on stdout/stdin; notifications go to stderr.
#[derive(Debug, Clone, Default)]
pub struct TerminalUi;

impl PlatformUi for TerminalUi {
    async fn confirm(&self, prompt: ConfirmPrompt) -> bool {
        let question = format!(
            "{}: {} [y = {}, N = {}] ",
            prompt.title, prompt.message, prompt.confirm_label, prompt.cancel_label
        );
        match prompt_line(&question).await {
            Ok(answer) => is_yes(&answer),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read confirmation");
                false
            }
        }
    }

    async fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn prompt_line(question: &str) -> io::Result<String> {
    let question = question.to_owned();
    task::spawn_blocking(move || {
        use std::io::Write;
        print!("{question}");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_owned())
    })
    .await
    .map_err(|err| io::Error::new(io::ErrorKind::Interrupted, err))?
}
