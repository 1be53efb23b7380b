// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod check;
pub mod config;
pub mod deploy;
pub mod experiments;
pub mod md5;

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;

use checkfiles_core::domain::config::ConfigManifest;
use checkfiles_core::infrastructure::slack::{NoopNotifier, Notifier, SlackNotifier};
use checkfiles_portal::PortalClient;

/// Merge order: manifest, then environment-backed flags, then explicit
/// flags. The caller passes the already-parsed flag values.
pub(crate) struct PortalOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bot_token: Option<String>,
}

pub(crate) fn resolve_portal(
    config_path: Option<PathBuf>,
    overrides: PortalOverrides,
) -> Result<(ConfigManifest, Arc<PortalClient>, Arc<dyn Notifier>)> {
    let mut manifest = ConfigManifest::load(config_path.as_deref())?;
    if let Some(url) = overrides.url {
        manifest.spec.portal.url = url;
    }
    if let Some(username) = overrides.username {
        manifest.spec.portal.access_key_id = Some(username);
    }
    if let Some(password) = overrides.password {
        manifest.spec.portal.secret_access_key = Some(password);
    }
    if let Some(bot_token) = overrides.bot_token {
        manifest.spec.notify.bot_token = Some(bot_token);
    }
    manifest.validate()?;

    if manifest.spec.portal.url.is_empty() {
        bail!("no portal url; pass it as the URL argument or set spec.portal.url");
    }
    let portal = Arc::new(PortalClient::new(
        &manifest.spec.portal.url,
        manifest.spec.portal.access_key_id.clone().unwrap_or_default(),
        manifest
            .spec
            .portal
            .secret_access_key
            .clone()
            .unwrap_or_default(),
    )?);

    let notifier: Arc<dyn Notifier> = match &manifest.spec.notify.bot_token {
        Some(bot_token) => Arc::new(SlackNotifier::new(
            bot_token.clone(),
            manifest.spec.notify.channel.clone(),
        )),
        None => Arc::new(NoopNotifier),
    };
    Ok((manifest, portal, notifier))
}
