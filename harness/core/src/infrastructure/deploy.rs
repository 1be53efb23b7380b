// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Cloud provisioning for a harness node.
//!
//! A deploy renders the committed cloud-config template for a pushed
//! commit and launches one instance whose user data boots the harness at
//! exactly that commit. The template is read from the git object store,
//! not the working tree: what runs in the cloud is what was pushed.

use git2::{BranchType, Repository};
use handlebars::Handlebars;
use serde_json::json;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Path of the user-data template inside the repository.
pub const CLOUD_CONFIG_TEMPLATE: &str = "deploy/cloud-config.yml.hbs";

/// Folder of operator public keys baked into every instance.
const AUTH_KEYS_BASE: &str = "s3://encoded-conf-prod/ssh-keys";

/// DNS zone instances register under.
const DNS_ZONE: &str = "encodedcc.org";

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("git: {0}")]
    Git(#[from] git2::Error),

    #[error("commit {0} not found on any remote branch; push it first")]
    CommitNotPushed(String),

    #[error("{0:?} is an invalid instance name, only [a-z0-9] and hyphen allowed")]
    InvalidName(String),

    #[error("an instance already exists with name: {0}")]
    InstanceExists(String),

    #[error("no {CLOUD_CONFIG_TEMPLATE} in commit {commit}")]
    TemplateMissing { commit: String },

    #[error("cloud-config template: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("aws cli: {0}")]
    Aws(String),
}

#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Git branch or tag; current branch when absent.
    pub branch: Option<String>,

    /// Instance name; derived from branch, commit, and user when absent.
    pub name: Option<String>,

    pub image_id: String,
    pub instance_type: String,

    /// AWS credentials profile; `production` switches the DNS domain and
    /// the authorized-keys folder.
    pub profile: Option<String>,

    /// Arguments handed to `checkfiles` inside the instance.
    pub harness_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub instance_id: String,
    pub name: String,
    pub branch: String,
    pub commit: String,
    pub domain: String,
}

impl DeployOutcome {
    pub fn ssh_endpoint(&self) -> String {
        format!("{}.{}.{}", self.name, self.domain, DNS_ZONE)
    }
}

/// Lowercase, alphanumerics and single hyphens only: a DNS label.
pub fn nameify(s: &str) -> String {
    let mut name = String::with_capacity(s.len());
    let mut last_dash = false;
    for c in s.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
            last_dash = false;
        } else if !last_dash {
            name.push('-');
            last_dash = true;
        }
    }
    name.trim_matches('-').to_owned()
}

/// Single-quote shell quoting for the rendered harness arguments.
pub fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_=./:@%+".contains(c))
            {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Branch, short commit, and full id for what is being deployed.
fn resolve_commit(
    repo: &Repository,
    branch: Option<&str>,
) -> Result<(String, String, git2::Oid), DeployError> {
    let branch = match branch {
        Some(branch) => branch.to_owned(),
        None => {
            let head = repo.head()?;
            head.shorthand().unwrap_or("HEAD").to_owned()
        }
    };
    let object = repo.revparse_single(&branch)?;
    let commit = object.peel_to_commit()?;
    let short = commit
        .as_object()
        .short_id()?
        .as_str()
        .unwrap_or_default()
        .to_owned();
    Ok((branch, short, commit.id()))
}

/// Is the commit reachable from any remote branch?
fn commit_on_remote(repo: &Repository, oid: git2::Oid) -> Result<bool, DeployError> {
    for branch in repo.branches(Some(BranchType::Remote))? {
        let (branch, _) = branch?;
        let Some(target) = branch.get().target() else {
            continue;
        };
        if target == oid || repo.graph_descendant_of(target, oid)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The template blob as committed.
fn template_at_commit(repo: &Repository, oid: git2::Oid) -> Result<String, DeployError> {
    let commit = repo.find_commit(oid)?;
    let tree = commit.tree()?;
    let entry = tree
        .get_path(Path::new(CLOUD_CONFIG_TEMPLATE))
        .map_err(|_| DeployError::TemplateMissing {
            commit: oid.to_string(),
        })?;
    let blob = repo.find_blob(entry.id())?;
    String::from_utf8(blob.content().to_vec()).map_err(|_| DeployError::TemplateMissing {
        commit: oid.to_string(),
    })
}

fn read_ssh_pub_key() -> Option<String> {
    let path = dirs::home_dir()?.join(".ssh").join("id_rsa.pub");
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().next().map(str::to_owned)
}

pub fn render_user_data(
    template: &str,
    commit: &str,
    harness_args: &[String],
    ssh_pub_key: Option<&str>,
    auth_keys_dir: &str,
) -> Result<String, DeployError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(handlebars::no_escape);
    let rendered = registry.render_template(
        template,
        &json!({
            "commit": commit,
            "args": quote_args(harness_args),
            "local_ssh_key": ssh_pub_key.unwrap_or(""),
            "s3_auth_keys": auth_keys_dir,
        }),
    )?;
    Ok(rendered)
}

struct AwsCli {
    profile: Option<String>,
}

impl AwsCli {
    async fn run(&self, args: &[&str]) -> Result<String, DeployError> {
        let mut command = Command::new("aws");
        if let Some(profile) = &self.profile {
            command.arg("--profile").arg(profile);
        }
        command.args(args).stdin(Stdio::null());
        let output = command
            .output()
            .await
            .map_err(|e| DeployError::Aws(format!("could not run aws: {e}")))?;
        if !output.status.success() {
            return Err(DeployError::Aws(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_json(&self, args: &[&str]) -> Result<serde_json::Value, DeployError> {
        let mut args = args.to_vec();
        args.extend(["--output", "json"]);
        let stdout = self.run(&args).await?;
        serde_json::from_str(&stdout).map_err(|e| DeployError::Aws(format!("bad aws output: {e}")))
    }
}

/// Provision one harness instance for the requested commit.
pub async fn deploy(repo_dir: &Path, request: &DeployRequest) -> Result<DeployOutcome, DeployError> {
    let repo = Repository::discover(repo_dir)?;
    let (branch, short_commit, oid) = resolve_commit(&repo, request.branch.as_deref())?;
    if !commit_on_remote(&repo, oid)? {
        return Err(DeployError::CommitNotPushed(short_commit));
    }
    let template = template_at_commit(&repo, oid)?;

    let user = std::env::var("USER").unwrap_or_else(|_| "deployer".to_owned());
    let name = match &request.name {
        Some(name) => {
            if *name != nameify(name) {
                return Err(DeployError::InvalidName(name.clone()));
            }
            name.clone()
        }
        None => nameify(&format!("checkfiles-{branch}-{short_commit}-{user}")),
    };

    let production = request.profile.as_deref() == Some("production");
    let domain = if production { "production" } else { "instance" };
    let auth_type = if production { "prod" } else { "demo" };
    let auth_keys_dir = format!("{AUTH_KEYS_BASE}/{auth_type}-authorized_keys");

    let ssh_pub_key = read_ssh_pub_key();
    if ssh_pub_key.is_none() {
        warn!("no ~/.ssh/id_rsa.pub; the operator will have no ssh access to the new instance");
    }
    let user_data = render_user_data(
        &template,
        &short_commit,
        &request.harness_args,
        ssh_pub_key.as_deref(),
        &auth_keys_dir,
    )?;

    let aws = AwsCli {
        profile: request.profile.clone(),
    };

    let name_filter = format!("Name=tag:Name,Values={name}");
    let existing = aws
        .run_json(&[
            "ec2",
            "describe-instances",
            "--filters",
            &name_filter,
            "Name=instance-state-name,Values=pending,running,stopping,stopped",
        ])
        .await?;
    let reservations = existing["Reservations"].as_array();
    if reservations.is_some_and(|r| !r.is_empty()) {
        return Err(DeployError::InstanceExists(name));
    }

    let block_device_mappings = json!([{
        "DeviceName": "/dev/sda1",
        "Ebs": {
            "VolumeSize": 512,
            "VolumeType": "gp2",
            "DeleteOnTermination": true,
        },
    }])
    .to_string();

    let launched = aws
        .run_json(&[
            "ec2",
            "run-instances",
            "--count",
            "1",
            "--image-id",
            &request.image_id,
            "--instance-type",
            &request.instance_type,
            "--security-groups",
            "ssh-http-https",
            "--iam-instance-profile",
            "Name=encoded-instance",
            "--instance-initiated-shutdown-behavior",
            "terminate",
            "--block-device-mappings",
            &block_device_mappings,
            "--user-data",
            &user_data,
        ])
        .await?;
    let instance_id = launched["Instances"][0]["InstanceId"]
        .as_str()
        .ok_or_else(|| DeployError::Aws("run-instances returned no instance id".into()))?
        .to_owned();
    info!(%instance_id, %name, "instance launched");

    let tags = [
        format!("Key=Name,Value={name}"),
        format!("Key=branch,Value={branch}"),
        format!("Key=commit,Value={short_commit}"),
        format!("Key=started_by,Value={user}"),
    ];
    aws.run(&[
        "ec2",
        "create-tags",
        "--resources",
        &instance_id,
        "--tags",
        &tags[0],
        &tags[1],
        &tags[2],
        &tags[3],
    ])
    .await?;

    info!(%instance_id, "waiting for running state");
    aws.run(&["ec2", "wait", "instance-running", "--instance-ids", &instance_id])
        .await?;

    Ok(DeployOutcome {
        instance_id,
        name,
        branch,
        commit: short_commit,
        domain: domain.to_owned(),
    })
}
