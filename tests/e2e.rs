//! End-to-end tests for mini-awk
//!
//! These tests run complete programs through the library and verify the output.

use mini_awk::{Interpreter, Lexer, Parser};

/// Run a program over the lines of `input` and return the output
fn run_awk(program: &str, input: &str) -> Result<String, String> {
    let mut lexer = Lexer::new(program);
    let tokens = lexer.tokenize().map_err(|e| e.to_string())?;
    let mut parser = Parser::new(tokens);
    let ast = parser.parse().map_err(|e| e.to_string())?;

    let mut interpreter = Interpreter::new(&ast);
    let mut output = Vec::new();
    let records = input.lines().map(String::from).collect();
    interpreter.run(records, &mut output).map_err(|e| e.to_string())?;

    String::from_utf8(output).map_err(|e| e.to_string())
}

/// Run a program with a custom field separator
fn run_awk_with_fs(program: &str, input: &str, fs: &str) -> Result<String, String> {
    let tokens = mini_awk::tokenize(program).map_err(|e| e.to_string())?;
    let ast = mini_awk::parse(tokens).map_err(|e| e.to_string())?;

    let mut interpreter = Interpreter::new(&ast);
    interpreter.set_fs(fs);
    let mut output = Vec::new();
    let records = input.lines().map(String::from).collect();
    interpreter.run(records, &mut output).map_err(|e| e.to_string())?;

    String::from_utf8(output).map_err(|e| e.to_string())
}

/// Run a program and return its exit code along with the output
fn run_with_status(program: &str, input: &str) -> (i32, String) {
    let ast = mini_awk::parse(mini_awk::tokenize(program).unwrap()).unwrap();
    let mut output = Vec::new();
    let records = input.lines().map(String::from).collect();
    let code = mini_awk::run(&ast, records, &mut output).unwrap();
    (code, String::from_utf8(output).unwrap())
}

// ============================================================================
// Basic Output Tests
// ============================================================================

#[test]
fn test_hello_world() {
    let output = run_awk(r#"BEGIN { print "hi" }"#, "").unwrap();
    assert_eq!(output, "hi\n");
}

#[test]
fn test_print_number() {
    let output = run_awk("BEGIN { print 42 }", "").unwrap();
    assert_eq!(output, "42\n");
}

#[test]
fn test_print_concatenates_arguments() {
    let output = run_awk(r#"BEGIN { print "a", "b", 3 }"#, "").unwrap();
    assert_eq!(output, "ab3\n");
}

#[test]
fn test_print_uses_ors() {
    let output = run_awk(r#"BEGIN { ORS = ";" } { print $1 }"#, "x\ny").unwrap();
    assert_eq!(output, "x;y;");
}

#[test]
fn test_print_record_by_default() {
    let output = run_awk("{ print }", "line one\nline two").unwrap();
    assert_eq!(output, "line one\nline two\n");
}

// ============================================================================
// Field Access Tests
// ============================================================================

#[test]
fn test_field_splitting() {
    let output = run_awk("{ print NF; print $2 }", "a b c").unwrap();
    assert_eq!(output, "3\nb\n");
}

#[test]
fn test_last_field() {
    let output = run_awk("{ print $NF }", "one two three\nfour").unwrap();
    assert_eq!(output, "three\nfour\n");
}

#[test]
fn test_field_index_is_canonical() {
    let output = run_awk(r#"{ print $"02"; print $(1 + 0.0) }"#, "a b").unwrap();
    assert_eq!(output, "b\na\n");
}

#[test]
fn test_field_separator_option() {
    let output = run_awk_with_fs("{ print $3 }", "root:x:0:0", ":").unwrap();
    assert_eq!(output, "0\n");
}

#[test]
fn test_field_separator_in_begin() {
    let output = run_awk(r#"BEGIN { FS = "," } { print $2 }"#, "a,b,c").unwrap();
    assert_eq!(output, "b\n");
}

#[test]
fn test_field_separator_regex() {
    let output = run_awk_with_fs("{ print NF }", "a1b22c333d", "[0-9]+").unwrap();
    assert_eq!(output, "4\n");
}

#[test]
fn test_empty_fs_splits_characters() {
    let output = run_awk_with_fs("{ print NF; print $3 }", "abc", "").unwrap();
    assert_eq!(output, "3\nc\n");
}

#[test]
fn test_negative_field_is_error() {
    let err = run_awk("{ print $(-1) }", "a").unwrap_err();
    assert!(err.contains("field"));
}

// ============================================================================
// Arithmetic and Value Tests
// ============================================================================

#[test]
fn test_precedence() {
    let output = run_awk("BEGIN { print 1 + 2 * 3; print 2 ^ 3 ^ 2 }", "").unwrap();
    assert_eq!(output, "7\n512\n");
}

#[test]
fn test_numeric_coercion() {
    let output = run_awk(r#"BEGIN { print "abc" + "2"; print ("5" == "5.0") }"#, "").unwrap();
    assert_eq!(output, "2\n1\n");
}

#[test]
fn test_number_formatting() {
    let output = run_awk("BEGIN { print 10 / 4; print 1 / 3; print 3.0 + 0; print 3.0; print 0 - 0 }", "").unwrap();
    assert_eq!(output, "2.5\n0.33333\n3\n3.0\n0\n");
}

#[test]
fn test_string_comparison() {
    let output = run_awk(r#"BEGIN { print ("apple" < "banana"); print ("10" < "9") }"#, "").unwrap();
    assert_eq!(output, "1\n0\n");
}

#[test]
fn test_sum_column() {
    let output = run_awk("{ sum += $2 } END { print sum }", "a 10\nb 20\nc 12.5").unwrap();
    assert_eq!(output, "42.5\n");
}

#[test]
fn test_division_by_zero_is_error() {
    let err = run_awk("BEGIN { print 1 / 0 }", "").unwrap_err();
    assert!(err.contains("division by zero"));
}

#[test]
fn test_unset_variable_reads_zero() {
    let output = run_awk("BEGIN { print x; print x + 1 }", "").unwrap();
    assert_eq!(output, "0\n1\n");
}

// ============================================================================
// Pattern Tests
// ============================================================================

#[test]
fn test_condition_pattern() {
    let output = run_awk("$1 > 10 { print $2 }", "5 low\n15 high\n20 higher").unwrap();
    assert_eq!(output, "high\nhigher\n");
}

#[test]
fn test_regex_pattern() {
    let output = run_awk("`^err` { print NR }", "ok\nerror one\nfine\nerr two").unwrap();
    assert_eq!(output, "2\n4\n");
}

#[test]
fn test_match_operator() {
    let output = run_awk("$2 ~ `^[0-9]+$` { print $1 } $2 !~ `[0-9]` { print \"-\" }", "a 12\nb x\nc 7").unwrap();
    assert_eq!(output, "a\n-\nc\n");
}

#[test]
fn test_blocks_run_in_order() {
    let output = run_awk("{ print \"first\" } { print \"second\" }", "x").unwrap();
    assert_eq!(output, "first\nsecond\n");
}

// ============================================================================
// Control Flow Tests
// ============================================================================

#[test]
fn test_nested_loop_break() {
    let program = r#"BEGIN {
        outer = 0
        for (i = 0; i < 3; i++) {
            outer++
            for (j = 0; j < 5; j++) {
                if (j == 1) {
                    break
                }
            }
        }
        print outer
    }"#;
    assert_eq!(run_awk(program, "").unwrap(), "3\n");
}

#[test]
fn test_while_with_continue() {
    let program = r#"BEGIN {
        i = 0
        while (i < 6) {
            i++
            if (i % 2 == 0)
                continue
            printf "%d", i
        }
    }"#;
    assert_eq!(run_awk(program, "").unwrap(), "1\n3\n5\n");
}

#[test]
fn test_do_while_runs_once() {
    let output = run_awk("BEGIN { do { n++ } while (0); print n }", "").unwrap();
    assert_eq!(output, "1\n");
}

#[test]
fn test_ternary() {
    let output = run_awk(r#"{ print ($1 % 2 ? "odd" : "even") }"#, "1\n2").unwrap();
    assert_eq!(output, "odd\neven\n");
}

// ============================================================================
// Array Tests
// ============================================================================

#[test]
fn test_array_store_and_read() {
    let output = run_awk(r#"BEGIN { a[1] = "15"; a[2] = "30"; print a[1]; print a[2] }"#, "").unwrap();
    assert_eq!(output, "15\n30\n");
}

#[test]
fn test_delete_array() {
    let output = run_awk(r#"BEGIN { a[1] = "15"; delete a; print a[1] }"#, "").unwrap();
    assert_eq!(output, "0\n");
}

#[test]
fn test_count_words() {
    let program = "{ for (i = 1; i <= NF; i++) count[$i]++ } END { print count[\"the\"]; print count[\"cat\"] }";
    let output = run_awk(program, "the cat\nthe dog\nthe end").unwrap();
    assert_eq!(output, "3\n1\n");
}

#[test]
fn test_for_in_and_membership() {
    let program = r#"BEGIN {
        seen["a"] = 1; seen["b"] = 1
        n = 0
        for (k in seen) n++
        print n
        print ("a" in seen)
        print ("z" in seen)
    }"#;
    assert_eq!(run_awk(program, "").unwrap(), "2\n1\n0\n");
}

#[test]
fn test_scalar_used_as_array_is_error() {
    let err = run_awk("BEGIN { x = 1; x[1] = 2 }", "").unwrap_err();
    assert!(err.contains("array"));
}

// ============================================================================
// Function Tests
// ============================================================================

#[test]
fn test_return_value() {
    let output = run_awk("function f() { return 5; print \"unreached\" } BEGIN { print f() }", "").unwrap();
    assert_eq!(output, "5\n");
}

#[test]
fn test_recursive_function() {
    let program = "function fact(n) { if (n <= 1) return 1; return n * fact(n - 1) } BEGIN { print fact(10) }";
    assert_eq!(run_awk(program, "").unwrap(), "3628800\n");
}

#[test]
fn test_function_locals_are_discarded() {
    let program = "function f(x) { x = x * 2; return x } BEGIN { x = 3; print f(10); print x }";
    assert_eq!(run_awk(program, "").unwrap(), "20\n3\n");
}

#[test]
fn test_function_arity_mismatch() {
    let err = run_awk("function f(a) { return a } BEGIN { f(1, 2) }", "").unwrap_err();
    assert!(err.contains("expects 1 arguments"));
}

// ============================================================================
// Built-in Function Tests
// ============================================================================

#[test]
fn test_string_builtins() {
    let program = r#"BEGIN {
        print length("hello")
        print substr("hello", 1, 3)
        print index("hello", "lo")
        print toupper("abc")
    }"#;
    assert_eq!(run_awk(program, "").unwrap(), "5\nell\n3\nABC\n");
}

#[test]
fn test_gsub_and_sub() {
    let output = run_awk("{ print gsub(`a`, \"A\"); print $0 }", "banana").unwrap();
    assert_eq!(output, "3\nbAnAnA\n");

    let output = run_awk("{ print sub(`a`, \"A\"); print $0 }", "banana").unwrap();
    assert_eq!(output, "3\nbAnana\n");
}

#[test]
fn test_split() {
    let output = run_awk(r#"BEGIN { n = split("2024-01-15", d, "-"); print n; print d[0]; print d[2] }"#, "").unwrap();
    assert_eq!(output, "3\n2024\n15\n");
}

#[test]
fn test_match_builtin() {
    let output = run_awk("{ print match($0, `[0-9]`) }", "abc1\nnone").unwrap();
    assert_eq!(output, "4\n0\n");
}

#[test]
fn test_printf() {
    let output = run_awk(r#"{ printf "%-5s|%3d|%.2f", $1, $2, $3 }"#, "ab 7 3.14159").unwrap();
    assert_eq!(output, "ab   |  7|3.14\n");
}

#[test]
fn test_getline_reads_next_record() {
    let output = run_awk("NR == 1 { getline; print $0 } END { print NR }", "a\nb\nc").unwrap();
    assert_eq!(output, "b\n3\n");
}

// ============================================================================
// Exit Tests
// ============================================================================

#[test]
fn test_exit_code() {
    let (code, output) = run_with_status("{ print; if (NR == 2) exit 3 }", "a\nb\nc");
    assert_eq!(code, 3);
    assert_eq!(output, "a\nb\n");
}

#[test]
fn test_exit_in_begin_still_runs_end() {
    let (code, output) = run_with_status(r#"BEGIN { exit } { print "record" } END { print "end" }"#, "x\ny");
    assert_eq!(code, 0);
    assert_eq!(output, "end\n");
}

#[test]
fn test_exit_in_end_stops_end_blocks() {
    let (code, output) = run_with_status(r#"END { print "one"; exit 1; print "two" } END { print "three" }"#, "");
    assert_eq!(code, 1);
    assert_eq!(output, "one\n");
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_lex_error() {
    let err = run_awk("BEGIN { x = 1.2.3 }", "").unwrap_err();
    assert!(err.starts_with("lex error"));
}

#[test]
fn test_syntax_error() {
    let err = run_awk("BEGIN { print (1 }", "").unwrap_err();
    assert!(err.starts_with("syntax error"));
}

#[test]
fn test_invalid_regex() {
    assert!(run_awk("`(` { print }", "x").is_err());
}
