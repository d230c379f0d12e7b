use super::{CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling, PipelineLimits};

/// Imports made available to snippets. They live inside the generated
/// `main`, so nothing the snippet declares can clash with them at module
/// level.
const PRELUDE: &str = "    #[allow(unused_imports)]
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
    #[allow(unused_imports)]
    use std::io::{self, BufRead, Read, Write};
";

pub fn pipeline(limits: PipelineLimits) -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Rust,
        version: "1.75",
        source_file_name: "main.rs",
        support_files: Vec::new(),
        strategy: LanguageStrategy::Compiled {
            // rustc forks the system linker; the process group covers it.
            build: CommandTemplate::new(
                "rustc",
                &["--edition", "2021", "-O", "-o", "main", "main.rs"],
            ),
            check: Some(CommandTemplate::new(
                "rustc",
                &["--edition", "2021", "--emit=metadata", "-o", "main.rmeta", "main.rs"],
            )),
            run: CommandTemplate::new("./main", &[]),
            wrap: wrap_source,
        },
        env: Vec::new(),
        memory_ceiling: MemoryCeiling::AddressSpace,
        limits,
        available_libraries: &[
            "std::io", "std::collections", "std::time", "std::thread", "std::fmt", "std::cmp",
            "std::iter", "std::str",
        ],
    }
}

/// Where rustup keeps its toolchains, as seen by the service.
///
/// `rustc` on `PATH` is usually the rustup proxy, which locates toolchains
/// through `RUSTUP_HOME` or `$HOME/.rustup`. Children get `HOME` pointed at
/// their workspace, so the location is pinned here from the service's own
/// environment.
pub fn toolchain_env<F>(var: F) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    let home = var("HOME").filter(|home| !home.is_empty());
    let mut env = Vec::new();

    for (key, default_dir) in [("RUSTUP_HOME", ".rustup"), ("CARGO_HOME", ".cargo")] {
        let value = var(key)
            .filter(|value| !value.is_empty())
            .or_else(|| home.as_ref().map(|home| format!("{home}/{default_dir}")));
        if let Some(value) = value {
            env.push((key.to_string(), value));
        }
    }
    if let Some(toolchain) = var("RUSTUP_TOOLCHAIN").filter(|t| !t.is_empty()) {
        env.push(("RUSTUP_TOOLCHAIN".to_string(), toolchain));
    }

    env
}

/// Full programs are compiled verbatim; a snippet becomes the body of
/// `main`.
pub fn wrap_source(code: &str) -> String {
    if code.contains("fn main(") {
        return code.to_string();
    }

    format!("fn main() {{\n{PRELUDE}\n{code}\n}}\n")
}
