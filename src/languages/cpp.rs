use super::{CommandTemplate, Language, LanguagePipeline, LanguageStrategy, MemoryCeiling, PipelineLimits};

const HEADERS: &str = "#include <iostream>
#include <string>
#include <vector>
#include <algorithm>
#include <cmath>
#include <cstdlib>
#include <climits>
#include <ctime>
#include <map>
#include <set>
#include <queue>
#include <stack>
#include <deque>
#include <list>
#include <bitset>
#include <utility>
#include <functional>
#include <numeric>
#include <iterator>
#include <sstream>
#include <iomanip>
#include <exception>
using namespace std;

";

pub fn pipeline(limits: PipelineLimits) -> LanguagePipeline {
    LanguagePipeline {
        language: Language::Cpp,
        version: "C++17",
        source_file_name: "main.cpp",
        support_files: Vec::new(),
        strategy: LanguageStrategy::Compiled {
            build: CommandTemplate::new("g++", &["-std=c++17", "-O2", "-o", "main", "main.cpp"]),
            check: Some(CommandTemplate::new(
                "g++",
                &["-std=c++17", "-fsyntax-only", "main.cpp"],
            )),
            run: CommandTemplate::new("./main", &[]),
            wrap: wrap_source,
        },
        env: Vec::new(),
        memory_ceiling: MemoryCeiling::AddressSpace,
        limits,
        available_libraries: &[
            "iostream", "string", "vector", "algorithm", "cmath", "cstdlib", "climits", "ctime",
            "map", "set", "queue", "stack", "deque", "list", "bitset", "utility",
        ],
    }
}

pub fn wrap_source(code: &str) -> String {
    if code.contains("int main(") {
        return format!("{HEADERS}{code}\n");
    }

    format!(
        "{HEADERS}int main() {{
    try {{
{code}
    }} catch (const exception& e) {{
        cerr << \"Error: \" << e.what() << endl;
        return 1;
    }} catch (...) {{
        cerr << \"Unknown error occurred\" << endl;
        return 1;
    }}
    return 0;
}}
"
    )
}
