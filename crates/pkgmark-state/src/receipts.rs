use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::fs_utils::replace_file_atomically;
use crate::types::MarkFlag;
use crate::{InstallReceipt, PrefixLayout};

const FLAGS: [MarkFlag; 2] = [MarkFlag::OnRequest, MarkFlag::AsDependency];

/// Rewrites only the provenance flag lines of an existing receipt.
pub fn update_receipt_flags(layout: &PrefixLayout, receipt: &InstallReceipt) -> Result<PathBuf> {
    let path = layout.receipt_path(&receipt.name);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
    let payload = rewrite_flag_lines(&raw, receipt);
    replace_file_atomically(&layout.tmp_state_dir(), &path, payload.as_bytes())
        .with_context(|| format!("failed to write install receipt: {}", path.display()))?;
    Ok(path)
}

pub fn read_install_receipt(layout: &PrefixLayout, name: &str) -> Result<InstallReceipt> {
    let path = layout.receipt_path(name);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
    let receipt = parse_receipt(&raw)
        .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
    if receipt.name != name {
        return Err(anyhow!(
            "install receipt {} names '{}' instead of '{}'",
            path.display(),
            receipt.name,
            name
        ));
    }
    Ok(receipt)
}

pub fn read_install_receipts(layout: &PrefixLayout) -> Result<Vec<InstallReceipt>> {
    let dir = layout.installed_state_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut receipts = Vec::new();
    for entry in fs::read_dir(&dir)
        .with_context(|| format!("failed to read install state directory: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some("receipt") {
            continue;
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
        let receipt = parse_receipt(&raw)
            .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
        receipts.push(receipt);
    }

    receipts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(receipts)
}

pub(crate) fn rewrite_flag_lines(raw: &str, receipt: &InstallReceipt) -> String {
    let mut seen = [false; FLAGS.len()];
    let mut payload = String::with_capacity(raw.len() + 64);

    for line in raw.lines() {
        let key = line.split_once('=').map(|(k, _)| k.trim());
        match FLAGS
            .iter()
            .position(|flag| Some(flag.receipt_key()) == key)
        {
            Some(idx) => {
                seen[idx] = true;
                let flag = FLAGS[idx];
                payload.push_str(&format!(
                    "{}={}\n",
                    flag.receipt_key(),
                    flag.current(receipt)
                ));
            }
            None => {
                payload.push_str(line);
                payload.push('\n');
            }
        }
    }

    for (idx, flag) in FLAGS.iter().enumerate() {
        if !seen[idx] {
            payload.push_str(&format!(
                "{}={}\n",
                flag.receipt_key(),
                flag.current(receipt)
            ));
        }
    }

    payload
}

pub(crate) fn parse_receipt(raw: &str) -> Result<InstallReceipt> {
    let mut name = None;
    let mut version = None;
    let mut dependencies = Vec::new();
    let mut installed_on_request = None;
    let mut installed_as_dependency = None;
    let mut install_reason = None;
    let mut installed_at_unix = None;
    let mut extra = Vec::new();

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let (k, v) = (k.trim(), v.trim());
        match k {
            "name" => name = Some(v.to_string()),
            "version" => version = Some(v.to_string()),
            "dependency" => dependencies.push(v.to_string()),
            "installed_on_request" => {
                installed_on_request = Some(parse_flag(v).context("installed_on_request")?)
            }
            "installed_as_dependency" => {
                installed_as_dependency = Some(parse_flag(v).context("installed_as_dependency")?)
            }
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {
                if k == "install_reason" {
                    install_reason = Some(parse_legacy_reason(v)?);
                }
                extra.push((k.to_string(), v.to_string()));
            }
        }
    }

    // Receipts written before the flags existed only carry install_reason.
    let (legacy_on_request, legacy_as_dependency) = install_reason.unwrap_or((true, false));

    Ok(InstallReceipt {
        name: name.context("missing name")?,
        version: version.context("missing version")?,
        dependencies,
        installed_on_request: installed_on_request.unwrap_or(legacy_on_request),
        installed_as_dependency: installed_as_dependency.unwrap_or(legacy_as_dependency),
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
        extra,
    })
}

fn parse_flag(value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(anyhow!("expected true or false, got '{value}'")),
    }
}

fn parse_legacy_reason(value: &str) -> Result<(bool, bool)> {
    match value {
        "root" => Ok((true, false)),
        "dependency" => Ok((false, true)),
        _ => Err(anyhow!("invalid install_reason: {value}")),
    }
}
