use super::{CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling, PipelineLimits};

pub fn pipeline(limits: PipelineLimits) -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Python,
        version: "3.12",
        source_file_name: "main.py",
        support_files: Vec::new(),
        strategy: LanguageStrategy::Interpreted {
            check: CommandTemplate::new("python3", &["-m", "py_compile", "main.py"]),
            // Unbuffered, so output printed before a timeout kill is kept.
            run: CommandTemplate::new("python3", &["-u", "main.py"]),
        },
        env: vec![
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
            ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
        ],
        memory_ceiling: MemoryCeiling::AddressSpace,
        limits,
        available_libraries: &[
            "builtins", "sys", "os", "math", "random", "json", "datetime", "collections",
            "itertools", "functools", "operator", "string", "re", "time", "calendar", "hashlib",
            "base64", "urllib", "http",
        ],
    }
}
