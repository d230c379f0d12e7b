use super::{CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling, PipelineLimits};

const GO_MOD: &str = "module main\n\ngo 1.21\n";

pub fn pipeline(limits: PipelineLimits) -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Go,
        version: "1.21",
        source_file_name: "main.go",
        support_files: vec![("go.mod", GO_MOD)],
        strategy: LanguageStrategy::Compiled {
            build: CommandTemplate::new("go", &["build", "-o", "main", "main.go"]),
            check: Some(CommandTemplate::new(
                "go",
                &["build", "-o", "/dev/null", "main.go"],
            )),
            run: CommandTemplate::new("./main", &[]).with_env("GOMEMLIMIT", "{memory_mb}MiB"),
            wrap: wrap_source,
        },
        env: [
            ("GOCACHE", "{workspace}/.cache/go-build"),
            ("GOPATH", "{workspace}/.gopath"),
            ("GOTMPDIR", "{workspace}/tmp"),
            ("GO111MODULE", "on"),
            ("GOTOOLCHAIN", "local"),
            ("GOFLAGS", "-mod=mod"),
            ("CGO_ENABLED", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        memory_ceiling: MemoryCeiling::RuntimeFlag,
        limits,
        available_libraries: &[
            "fmt", "os", "strings", "strconv", "math", "sort", "time", "bufio", "bytes", "io",
            "regexp", "unicode", "crypto/*", "encoding/*", "path/filepath", "runtime",
        ],
    }
}

/// Go rejects unused imports, so only a bare snippet gets `fmt` imported
/// for it; code that already has `func main()` brings its own imports.
pub fn wrap_source(code: &str) -> String {
    if code.contains("package main") {
        return code.to_string();
    }

    if code.contains("func main()") {
        return format!("package main\n\n{code}\n");
    }

    format!(
        "package main

import \"fmt\"

var _ = fmt.Sprint

func main() {{
{code}
}}
"
    )
}
