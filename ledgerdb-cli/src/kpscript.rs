use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::credentials::CredentialSource;

const OK_LINE: &str = "OK: Operation completed successfully.";
const MASK: &str = "********";

/// KeePass database read through the `KPScript` command line tool.
pub struct KpScript {
    program: PathBuf,
    database: PathBuf,
    password: String,
}

impl KpScript {
    /// `password` may be `@path`, in which case the first line of that file is
    /// the database password.
    pub fn open(database: &Path, password: &str) -> Result<Self> {
        if !database.exists() {
            bail!("KeePass database not found: {}", database.display());
        }
        let program = which::which("KPScript")
            .context("KPScript not found on PATH (install it or pass --credentials <toml>)")?;
        Ok(Self {
            program,
            database: database.to_path_buf(),
            password: resolve_password(password)?,
        })
    }

    fn call(&self, command: &str, args: &[String]) -> Result<String> {
        let mut argv = vec![
            format!("-c:{command}"),
            self.database.display().to_string(),
            format!("-pw:{}", self.password),
        ];
        argv.extend_from_slice(args);
        tracing::debug!(command = %masked_command(&argv), "running KPScript");

        let out = Command::new(&self.program)
            .args(&argv)
            .output()
            .with_context(|| format!("running {}", self.program.display()))?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));

        if !out.status.success() {
            tracing::error!(%output, "KPScript failed");
            bail!("KPScript failed with status: {}", out.status);
        }
        parse_output(&output).inspect_err(|_| tracing::error!(%output, "unexpected KPScript output"))
    }
}

impl CredentialSource for KpScript {
    fn entry(&self, title: &str, field: &str) -> Result<String> {
        self.call(
            "GetEntryString",
            &[
                format!("-ref-Title:{title}"),
                "-FailIfNoEntry".to_string(),
                format!("-Field:{field}"),
            ],
        )
        .with_context(|| format!("reading {field} of entry {title:?}"))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(mask_listing(&self.call("ListEntries", &[])?))
    }
}

/// `@path` → first line of the file at `path`; anything else is the password.
pub fn resolve_password(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
            Ok(text.lines().next().unwrap_or_default().to_string())
        }
        None => Ok(arg.to_string()),
    }
}

/// Strip the trailing status line from KPScript output.
pub fn parse_output(output: &str) -> Result<String> {
    let lines: Vec<&str> = output.lines().collect();
    match lines.split_last() {
        Some((&last, rest)) if last == OK_LINE && !rest.is_empty() => Ok(rest.join("\n")),
        _ => bail!("KPScript did not report success"),
    }
}

/// `ListEntries` output reduced to string fields, passwords masked and the
/// recycle bin left out. Entries are separated by an empty line.
pub fn mask_listing(output: &str) -> Vec<String> {
    let mut out = Vec::new();
    for block in output.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let lines: Vec<&str> = block.lines().map(|l| l.trim_end_matches('\r')).collect();
        if lines.iter().any(|l| *l == "GRPN: Recycle Bin") {
            continue;
        }
        for line in lines.iter().filter(|l| l.starts_with("S: ")) {
            if line.starts_with("S: Password =") {
                out.push(format!("S: Password = {MASK}"));
            } else {
                out.push(line.to_string());
            }
        }
        out.push(String::new());
    }
    out
}

fn masked_command(argv: &[String]) -> String {
    let mut parts = vec!["KPScript".to_string()];
    parts.extend(argv.iter().map(|a| {
        if a.starts_with("-pw:") {
            "-pw:******".to_string()
        } else {
            a.clone()
        }
    }));
    parts.join(" ")
}
