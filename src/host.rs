//! Hand-off of a [`ProjectEnv`] to the host build tool.
//!
//! The tool that compiles the firmware owns the real build environment.
//! Each target renders our definitions in a form that host can consume:
//! compiler flags for PlatformIO `build_flags = !cmd` or a Makefile, a C
//! header to `#include`, or cargo directives for a Rust build script.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::define::DefineValue;
use crate::env::ProjectEnv;
use crate::error::{InjectError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Flags,
    Header,
    Cargo,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Self::Flags => "flags",
            Self::Header => "header",
            Self::Cargo => "cargo",
        }
    }

    pub fn render(self, env: &ProjectEnv) -> Result<String> {
        match self {
            Self::Flags => Ok(render_flags(env)),
            Self::Header => Ok(render_header(env)),
            Self::Cargo => render_cargo(env),
        }
    }
}

impl FromStr for Target {
    type Err = InjectError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flags" => Ok(Self::Flags),
            "header" => Ok(Self::Header),
            "cargo" => Ok(Self::Cargo),
            other => Err(InjectError::Usage(format!(
                "unknown target '{other}', expected flags, header or cargo"
            ))),
        }
    }
}

/// Single-quote `arg` for a POSIX shell
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

fn render_flags(env: &ProjectEnv) -> String {
    env.defines()
        .iter()
        .map(|define| format!("{}\n", shell_quote(&format!("-D{define}"))))
        .collect()
}

const HEADER_GUARD: &str = "MQTT_CONFIG_INJECT_H";

fn render_header(env: &ProjectEnv) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_header(&mut out, env);
    out
}

fn write_header(out: &mut String, env: &ProjectEnv) -> fmt::Result {
    writeln!(
        out,
        "/* Generated by {} {}, do not edit. */",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )?;
    if let (Some(path), Some(sha)) = (env.config_path(), env.config_sha256()) {
        writeln!(out, "/* Source: {} (sha256 {}) */", path.display(), sha)?;
    }
    writeln!(out, "#ifndef {HEADER_GUARD}")?;
    writeln!(out, "#define {HEADER_GUARD}")?;
    writeln!(out)?;
    for define in env.defines() {
        match define.macro_body() {
            Some(body) => writeln!(out, "#define {} {}", define.name, body)?,
            None => writeln!(out, "#define {}", define.name)?,
        }
    }
    writeln!(out)?;
    writeln!(out, "#endif /* {HEADER_GUARD} */")
}

/// Values go out unquoted so `env!()` yields the text itself
fn render_cargo(env: &ProjectEnv) -> Result<String> {
    if let Some(define) = env.defines().iter().find(|d| {
        matches!(&d.value, DefineValue::Str(text) if text.contains(['\n', '\r']))
    }) {
        return Err(InjectError::Unrepresentable {
            name: define.name.to_string(),
            target: Target::Cargo.name(),
        });
    }

    let mut out = String::new();
    let _ = write_cargo(&mut out, env);
    Ok(out)
}

fn write_cargo(out: &mut String, env: &ProjectEnv) -> fmt::Result {
    if let Some(path) = env.config_path() {
        writeln!(out, "cargo:rerun-if-changed={}", path.display())?;
    }
    for define in env.defines() {
        match &define.value {
            DefineValue::Flag => writeln!(out, "cargo:rustc-env={}=1", define.name)?,
            DefineValue::Int(value) => writeln!(out, "cargo:rustc-env={}={value}", define.name)?,
            DefineValue::Str(text) => writeln!(out, "cargo:rustc-env={}={text}", define.name)?,
        }
    }
    Ok(())
}
