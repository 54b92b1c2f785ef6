//! Rendering of the C translation unit for one suite.

use permtest_types::{ExpandedCase, ExpandedSuite};

use crate::harness::HarnessConfig;

const BANNER: &str = "//////////////// AUTOGENERATED TEST ////////////////\n";

/// Render the complete unit: preamble, one function per case, dispatcher.
///
/// The output depends only on `suite` and `harness`, so rendering twice
/// gives byte-identical text.
pub fn render_unit(suite: &ExpandedSuite, harness: &HarnessConfig) -> String {
    let mut out = String::new();
    out.push_str(BANNER);
    push_block(&mut out, &harness.preamble);
    out.push_str("#include <stdint.h>\n");
    out.push_str("#include <stdlib.h>\n");

    for case in &suite.cases {
        out.push('\n');
        render_case(&mut out, suite, case, harness);
    }

    out.push('\n');
    render_dispatcher(&mut out, suite);
    out
}

/// Name of the function generated for case `index`.
pub fn case_fn(index: usize) -> String {
    format!("test_case{index}")
}

fn render_case(out: &mut String, suite: &ExpandedSuite, case: &ExpandedCase, harness: &HarnessConfig) {
    let varying = case.varying_keys();
    out.push_str(&format!("void {}(", case_fn(case.case.index)));
    if varying.is_empty() {
        out.push_str("void");
    } else {
        let params: Vec<String> = varying
            .iter()
            .map(|k| format!("\n        __attribute__((unused)) intmax_t {k}"))
            .collect();
        out.push_str(&params.join(","));
    }
    out.push_str(") {\n");

    // Suite-wide constants arrive as compiler definitions instead.
    let local: Vec<(&String, String)> = case
        .constants
        .iter()
        .filter(|(k, _)| !suite.constants.contains_key(*k))
        .map(|(k, v)| (k, v.to_c_token()))
        .collect();
    for (k, v) in &local {
        out.push_str(&format!("    #define {k} {v}\n"));
    }

    push_block(out, &harness.setup);
    out.push('\n');
    out.push_str(&format!("    // test case {}\n", case.case.index));
    out.push_str(&format!(
        "    #line {} \"{}\"\n",
        case.case.line,
        suite.suite.path.display()
    ));
    push_block(out, &case.case.code);
    push_block(out, &harness.teardown);
    out.push('\n');

    for (k, _) in &local {
        out.push_str(&format!("    #undef {k}\n"));
    }
    out.push_str("}\n");
}

fn render_dispatcher(out: &mut String, suite: &ExpandedSuite) {
    out.push_str("int main(int argc, char **argv) {\n");
    out.push_str("    int case_ = (argc == 3) ? atoi(argv[1]) : 0;\n");
    out.push_str("    int perm = (argc == 3) ? atoi(argv[2]) : 0;\n");
    out.push_str("    (void)case_;\n");
    out.push_str("    (void)perm;\n");

    for (case, perm) in suite.permutations() {
        let args: Vec<String> = case
            .varying_keys()
            .iter()
            .map(|k| perm.params.get(*k).map(|v| v.to_c_token()).unwrap_or_default())
            .collect();
        out.push_str(&format!(
            "    if (argc != 3 || (case_ == {} && perm == {})) {{ {}({}); }}\n",
            perm.case,
            perm.index,
            case_fn(perm.case),
            args.join(", ")
        ));
    }

    out.push_str("    return 0;\n");
    out.push_str("}\n");
}

/// Append `text`, making sure it ends with a newline.
fn push_block(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
}
