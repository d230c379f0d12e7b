use super::{CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling, PipelineLimits};

pub fn pipeline(limits: PipelineLimits) -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Javascript,
        version: "20",
        source_file_name: "main.js",
        support_files: Vec::new(),
        strategy: LanguageStrategy::Interpreted {
            check: CommandTemplate::new("node", &["--check", "main.js"]),
            // V8 reserves far more address space than it uses, so the heap
            // ceiling goes through the runtime instead of RLIMIT_AS.
            run: CommandTemplate::new("node", &["--max-old-space-size={memory_mb}", "main.js"]),
        },
        env: Vec::new(),
        memory_ceiling: MemoryCeiling::RuntimeFlag,
        limits,
        available_libraries: &[
            "console", "Math", "JSON", "Date", "Array", "Object", "String", "Number", "Map",
            "Set", "Promise", "fs", "path", "util", "readline",
        ],
    }
}
