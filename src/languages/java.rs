use super::{CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling, PipelineLimits};

const IMPORTS: &str = "import java.io.*;
import java.util.*;
import java.math.*;
import java.text.*;
import java.time.*;
import java.util.regex.*;

";

pub fn pipeline(limits: PipelineLimits) -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Java,
        version: "17",
        source_file_name: "Main.java",
        support_files: Vec::new(),
        strategy: LanguageStrategy::Compiled {
            build: CommandTemplate::new("javac", &["-encoding", "UTF-8", "-d", ".", "Main.java"]),
            check: None,
            run: CommandTemplate::new("java", &["-Xmx{memory_mb}m", "-cp", ".", "Main"]),
            wrap: wrap_source,
        },
        env: Vec::new(),
        memory_ceiling: MemoryCeiling::RuntimeFlag,
        limits,
        available_libraries: &[
            "java.lang.*", "java.util.*", "java.io.*", "java.math.*", "java.text.*",
            "java.time.*", "java.util.regex.*",
        ],
    }
}

/// A full program must declare `public class Main`; anything without both
/// a class and a `main` method is treated as the body of `main`.
pub fn wrap_source(code: &str) -> String {
    if code.contains("class ") && code.contains("public static void main") {
        return format!("{IMPORTS}{code}\n");
    }

    format!(
        "{IMPORTS}public class Main {{
    public static void main(String[] args) throws Exception {{
{code}
    }}
}}
"
    )
}
