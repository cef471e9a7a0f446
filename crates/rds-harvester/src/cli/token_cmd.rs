//! `rds-harvester token`: obtain or check a bearer token and print it.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use super::args::SessionArgs;
use crate::config::HarvestConfig;
use crate::renderer::chromium::ChromiumFactory;
use crate::session::token::decode_expiry;
use crate::session::{obtain_token, BrowserTokenProvider};

#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

pub async fn run(args: TokenArgs) -> Result<()> {
    let mut config = HarvestConfig::default();
    args.session.apply(&mut config)?;

    let factory = ChromiumFactory::new(config.browser.clone());
    let provider = BrowserTokenProvider::new(&factory, config.token.clone());
    let token = obtain_token(args.session.supplied_token(), &provider, Utc::now()).await?;

    println!("{token}");
    match decode_expiry(&token) {
        Ok(expires_at) => {
            let left = expires_at - Utc::now();
            eprintln!("expires at {expires_at} ({} min left)", left.num_minutes());
        }
        Err(e) => eprintln!("expiry unknown: {e}"),
    }
    Ok(())
}
