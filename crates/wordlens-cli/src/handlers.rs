//! Command handlers for CLI operations

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};
use wordlens_client::{ApiClient, BulkImages, CredentialStore, Session};
use wordlens_core::{ClientConfig, Credential, Error, Query};

use crate::cli::{Cli, Command, KeyAction};
use crate::render::{
    image_file_name, render_bulk, render_embeddings, render_image, render_search,
};

/// Everything a command needs, resolved once from flags and files.
struct AppContext {
    /// Directory holding config and settings.
    home: PathBuf,
    /// Client configuration after flag overrides.
    config: ClientConfig,
    /// API key lookup chain.
    credentials: CredentialStore,
}

/// Initialize tracing; logs go to stderr so results on stdout stay clean.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    Registry::default()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();
}

/// Run the parsed command.
///
/// # Errors
/// Returns an error carrying a user-facing message if setup or the action fails
pub async fn run(cli: Cli) -> Result<()> {
    let context = load_context(&cli)?;

    let outcome = match cli.command {
        Command::Key { action } => handle_key(&context, action),
        Command::Nearest {
            words,
            limit,
            save_images,
        } => {
            let limit_text = limit.unwrap_or_else(|| context.config.default_limit().to_string());
            handle_nearest(&context, &words, &limit_text, save_images.as_deref()).await
        }
        Command::Embed { words, full } => handle_embed(&context, &words, full).await,
        Command::Image { words, output } => handle_image(&context, &words, output.as_deref()).await,
        Command::BulkImages { words, output_dir } => {
            handle_bulk_images(&context, &words, output_dir.as_deref()).await
        }
    };

    outcome.map_err(|error| {
        tracing::debug!(%error, "command failed");
        anyhow!(error.user_message())
    })
}

fn load_context(cli: &Cli) -> Result<AppContext> {
    let home = match &cli.home {
        Some(home) => home.clone(),
        None => ClientConfig::default_home().context("Could not locate the wordlens home directory")?,
    };

    let mut config = ClientConfig::load_or_create(&home).unwrap_or_else(|error| {
        tracing::warn!("Failed to load config from {}: {error}", home.display());
        tracing::warn!("Using default configuration");
        ClientConfig::default()
    });
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }

    let credentials = CredentialStore::with_default_chain(&home);
    tracing::debug!(home = %home.display(), providers = ?credentials.providers(), "resolved context");

    Ok(AppContext {
        home,
        config,
        credentials,
    })
}

fn session(context: &AppContext) -> Result<Session, Error> {
    let credential = context.credentials.load_or_empty();
    Ok(Session::new(ApiClient::from_config(&context.config, credential)?))
}

async fn handle_nearest(
    context: &AppContext,
    words: &[String],
    limit_text: &str,
    save_dir: Option<&Path>,
) -> Result<(), Error> {
    let session = session(context)?;
    let view = session.search(&words.join(" "), limit_text).await?;

    render_search(&mut io::stdout().lock(), &view)?;
    if let Some(dir) = save_dir {
        save_images(dir, &view.images)?;
    }
    Ok(())
}

async fn handle_embed(context: &AppContext, words: &[String], full: bool) -> Result<(), Error> {
    let session = session(context)?;
    let result = session.embed(&words.join(" ")).await?;
    render_embeddings(&mut io::stdout().lock(), &result, full)?;
    Ok(())
}

async fn handle_image(
    context: &AppContext,
    words: &[String],
    output: Option<&Path>,
) -> Result<(), Error> {
    let session = session(context)?;
    let image = session.lookup_image(&words.join(" ")).await?;

    render_image(&mut io::stdout().lock(), &image)?;
    if let Some(path) = output {
        image.save(path)?;
        tracing::info!(path = %path.display(), "saved image");
    }
    Ok(())
}

async fn handle_bulk_images(
    context: &AppContext,
    words: &[String],
    output_dir: Option<&Path>,
) -> Result<(), Error> {
    let query = Query::from_words(words)?;
    let session = session(context)?;
    let images = session.client().fetch_bulk_images(query.words()).await?;

    render_bulk(&mut io::stdout().lock(), query.words(), &images)?;
    if let Some(dir) = output_dir {
        save_images(dir, &images)?;
    }
    Ok(())
}

fn handle_key(context: &AppContext, action: KeyAction) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    match action {
        KeyAction::Set { key } => {
            let credential = Credential::new(key);
            if credential.is_empty() {
                return Err(Error::InvalidInput("The API key must not be empty.".to_owned()));
            }
            context.credentials.save(&credential)?;
            writeln!(out, "API key saved under {}", context.home.display())?;
        }
        KeyAction::Show => match context.credentials.resolve() {
            Some((credential, source)) => {
                writeln!(out, "{} (from {source})", credential.masked())?;
            }
            None => writeln!(out, "No API key configured")?,
        },
        KeyAction::Clear => {
            if context.credentials.clear()? {
                writeln!(out, "API key removed from local settings")?;
            } else {
                writeln!(out, "No API key stored in local settings")?;
            }
        }
    }
    Ok(())
}

/// Writes every image to `dir` as `<word>.<ext>`.
///
/// Words that sanitize to the same file name get `-2`, `-3`, ... suffixes in
/// map order.
fn save_images(dir: &Path, images: &BulkImages) -> Result<(), Error> {
    fs::create_dir_all(dir)?;
    let mut taken = HashSet::new();
    for (word, image) in images {
        let path = dir.join(unique_file_name(&mut taken, word, image.extension()));
        image.save(&path)?;
        tracing::info!(path = %path.display(), "saved image");
    }
    Ok(())
}

/// File name for `word` not yet in `taken`; records the returned name.
fn unique_file_name(taken: &mut HashSet<String>, word: &str, extension: &str) -> String {
    let mut name = image_file_name(word, extension);
    let mut suffix = 2_u32;
    while !taken.insert(name.clone()) {
        name = image_file_name(&format!("{word}-{suffix}"), extension);
        suffix += 1;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use tempfile::TempDir;
    use wordlens_client::mock::sample_png_base64;
    use wordlens_client::ImageResult;

    fn context_in(temp: &TempDir, extra: &[&str]) -> AppContext {
        let home = temp.path().to_str().expect("utf8 path");
        let mut args = vec!["wordlens", "--home", home];
        args.extend_from_slice(extra);
        args.extend_from_slice(&["key", "show"]);
        let cli = Cli::try_parse_from(args).expect("parse");
        load_context(&cli).expect("context")
    }

    #[test]
    fn test_context_creates_config() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let context = context_in(&temp, &[]);

        assert!(ClientConfig::config_path(temp.path()).exists());
        assert_eq!(context.home, temp.path());
    }

    #[test]
    fn test_base_url_flag_overrides_config() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let context = context_in(&temp, &["--base-url", "https://words.test"]);
        assert_eq!(context.config.base_url, "https://words.test");
    }

    #[test]
    fn test_broken_config_falls_back_to_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::write(ClientConfig::config_path(temp.path()), "base_url = [").expect("write");

        let context = context_in(&temp, &[]);
        assert_eq!(context.config, ClientConfig::default());
    }

    #[test]
    fn test_save_images_writes_each_word() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let encoded = sample_png_base64(1, 1).expect("png");
        let mut images = BulkImages::new();
        for word in ["cat", "new york", "new_york", "new/york"] {
            let image = ImageResult::from_base64(word, &encoded).expect("decode");
            images.insert(word.to_owned(), image);
        }

        let dir = temp.path().join("out");
        save_images(&dir, &images).expect("save");
        assert!(dir.join("cat.png").exists());
        assert!(dir.join("new_york.png").exists());
        assert!(dir.join("new_york-2.png").exists());
        assert!(dir.join("new_york-3.png").exists());
        assert_eq!(fs::read_dir(&dir).expect("list").count(), 4);
    }

    #[test]
    fn test_unique_file_name_skips_taken_names() {
        let mut taken = HashSet::new();
        assert_eq!(unique_file_name(&mut taken, "a b", "png"), "a_b.png");
        assert_eq!(unique_file_name(&mut taken, "a_b", "png"), "a_b-2.png");
        assert_eq!(unique_file_name(&mut taken, "a_b-2", "png"), "a_b-2-2.png");
        assert_eq!(unique_file_name(&mut taken, "a_b", "jpg"), "a_b.jpg");
    }
}
