// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `deploy`: provision a harness instance in the cloud.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;

use checkfiles_core::infrastructure::deploy::{deploy, DeployRequest};

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Git branch or tag (default: current branch)
    #[arg(short = 'b', long)]
    pub branch: Option<String>,

    /// Instance name (default: derived from branch, commit, and user)
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Machine image for the instance
    #[arg(long, default_value = "ami-0a00ce72")]
    pub image_id: String,

    /// Instance type; pick 'c5.9xlarge' when there are many files to check
    #[arg(long, default_value = "c5.2xlarge")]
    pub instance_type: String,

    /// AWS creds profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Arguments for the harness inside the instance
    #[arg(value_name = "ARG", trailing_var_arg = true)]
    pub harness_args: Vec<String>,
}

pub async fn execute(args: DeployArgs) -> Result<()> {
    let request = DeployRequest {
        branch: args.branch,
        name: args.name,
        image_id: args.image_id,
        instance_type: args.instance_type,
        profile: args.profile,
        harness_args: args.harness_args,
    };

    println!("{}", "provisioning...".yellow());
    let outcome = deploy(Path::new("."), &request).await?;

    println!(
        "{} instance {} running {}@{}",
        "✓".green(),
        outcome.instance_id.bold(),
        outcome.branch,
        outcome.commit,
    );
    println!("{}", outcome.ssh_endpoint());
    println!("ssh ubuntu@{}", outcome.ssh_endpoint());
    Ok(())
}
