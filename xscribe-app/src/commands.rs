use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use xscribe_common::mask_secret;
use xscribe_config::XscribeConfig;
use xscribe_social::relay::{RelayOutcome, SkipCause, TweetRelay};
use xscribe_social::store::AccountStore;
use xscribe_social::twitter::cookies::{self, extract_key_cookies};
use xscribe_social::twitter::identity;
use xscribe_social::twitter::{FollowingFetcher, FollowingSync, SessionResolver, TwitterApi};

#[derive(Debug, Args)]
pub struct FollowingArgs {
    /// `auth_token` cookie value, or a full browser cookie string.
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
    /// Directory the account files are written to.
    #[arg(long, value_name = "DIR")]
    pub accounts_dir: Option<PathBuf>,
    /// Stop after this many pages.
    #[arg(long)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Day to upload, `YYYY-MM-DD`. Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long, env = "FLASK_API_URL")]
    pub api_url: Option<String>,
    #[arg(long, env = "FLASK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Directory holding `<date>.json` files.
    #[arg(long, value_name = "DIR")]
    pub tweets_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CookiesArgs {
    /// The `Cookie:` header value copied from the browser.
    pub cookie_string: String,
    /// Print values in full instead of masked.
    #[arg(long)]
    pub reveal: bool,
}

pub async fn following(cfg: &XscribeConfig, args: FollowingArgs) -> Result<()> {
    let twitter = &cfg.twitter;
    let settings = &cfg.following;

    let token = args
        .auth_token
        .or_else(|| twitter.auth_token().map(str::to_owned))
        .unwrap_or_default();
    let accounts_dir = args
        .accounts_dir
        .unwrap_or_else(|| settings.accounts_dir.clone());
    let max_pages = args.max_pages.or(settings.max_pages);

    let resolver = SessionResolver::new(
        &twitter.web_base,
        Duration::from_secs(twitter.handshake_timeout_secs),
    )?;
    let session = resolver.resolve(&token).await?;

    let api = TwitterApi::new(
        &twitter.api_base,
        &twitter.following_query_id,
        Duration::from_secs(twitter.request_timeout_secs),
    )?;
    let fetcher = FollowingFetcher::new(api)
        .with_page_size(settings.page_size)
        .with_page_delay(Duration::from_millis(settings.page_delay_ms))
        .with_max_pages(max_pages.map(|n| n as usize));
    let sync = FollowingSync::new(fetcher, AccountStore::new(&accounts_dir))
        .with_write_delay(Duration::from_millis(settings.write_delay_ms));

    let summary = sync.run(&session).await?;

    eprintln!(
        "following: {} new, {} updated, {} skipped, {} failed of {} fetched over {} page(s) ({}) -> {}",
        summary.new,
        summary.updated,
        summary.skipped,
        summary.failed,
        summary.total,
        summary.pages,
        summary.stop,
        accounts_dir.display()
    );
    Ok(())
}

pub async fn upload(cfg: &XscribeConfig, args: UploadArgs) -> Result<()> {
    let settings = &cfg.upload;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let api_url = args
        .api_url
        .or_else(|| settings.api_url().map(str::to_owned))
        .unwrap_or_default();
    let api_key = args
        .api_key
        .or_else(|| settings.api_key().map(str::to_owned))
        .unwrap_or_default();
    let tweets_dir = args
        .tweets_dir
        .unwrap_or_else(|| settings.tweets_dir.clone());

    let relay = TweetRelay::new(
        &api_url,
        &api_key,
        tweets_dir,
        Duration::from_secs(settings.timeout_secs),
    )?;

    match relay
        .upload_for(date)
        .await
        .with_context(|| format!("upload for {date} failed"))?
    {
        RelayOutcome::Skipped { file, cause } => {
            let why = match cause {
                SkipCause::MissingFile => "file not found",
                SkipCause::Empty => "no tweets in file",
            };
            eprintln!("upload: skipped {} ({why})", file.display());
        }
        RelayOutcome::Uploaded(stats) => {
            eprintln!(
                "upload: {} total, {} new, {} duplicates, {} errors",
                stats.total, stats.new, stats.duplicates, stats.errors
            );
        }
    }
    Ok(())
}

pub fn cookies(args: CookiesArgs) -> Result<()> {
    let jar = cookies::parse_cookie_string(&args.cookie_string);
    if jar.is_empty() {
        anyhow::bail!("no cookies found in the given string");
    }
    let show = |v: &str| {
        if args.reveal {
            v.to_string()
        } else {
            mask_secret(v)
        }
    };

    let key = extract_key_cookies(&args.cookie_string);
    println!("cookies:    {}", jar.keys().cloned().collect::<Vec<_>>().join(", "));
    println!(
        "auth_token: {}",
        key.auth_token.as_deref().map(&show).unwrap_or_else(|| "<missing>".into())
    );
    println!(
        "ct0:        {}",
        key.ct0.as_deref().map(&show).unwrap_or_else(|| "<missing>".into())
    );
    match identity::extract_user_id(&jar) {
        Ok(id) => println!("user id:    {id}"),
        Err(e) => println!("user id:    <missing> ({e})"),
    }

    if key.auth_token.is_none() {
        anyhow::bail!("cookie string has no auth_token; the following sync cannot use it");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_requires_auth_token() {
        let ok = CookiesArgs {
            cookie_string: "auth_token=abcdef0123456789abcdef; ct0=xyz; twid=u%3D42".into(),
            reveal: false,
        };
        assert!(cookies(ok).is_ok());

        let missing = CookiesArgs {
            cookie_string: "ct0=xyz".into(),
            reveal: true,
        };
        assert!(cookies(missing).is_err());

        let empty = CookiesArgs {
            cookie_string: "   ".into(),
            reveal: false,
        };
        assert!(cookies(empty).is_err());
    }

    #[tokio::test]
    async fn following_with_blank_token_fails_before_any_request() {
        let mut cfg = XscribeConfig::default();
        cfg.twitter.web_base = "http://127.0.0.1:9".into();
        let args = FollowingArgs {
            auth_token: Some("  ".into()),
            accounts_dir: None,
            max_pages: None,
        };
        let err = following(&cfg, args).await.unwrap_err();
        assert!(err.to_string().contains("auth token is empty"), "{err:#}");
    }

    #[tokio::test]
    async fn upload_without_key_is_a_config_error() {
        let cfg = XscribeConfig::default();
        let args = UploadArgs {
            date: NaiveDate::from_ymd_opt(2025, 1, 1),
            api_url: Some("http://127.0.0.1:9".into()),
            api_key: None,
            tweets_dir: None,
        };
        let err = upload(&cfg, args).await.unwrap_err();
        assert!(err.to_string().contains("api key is empty"), "{err:#}");
    }
}
