//! Compile source programs and execute them on the machine.

fn run_source(src: &str, input: &[u64]) -> Vec<u64> {
    let program = parser::parse(src).unwrap();
    let table = codegen::declare_program(&program).unwrap();
    let instrs = codegen::compile_to_instrs(&program, table).unwrap();
    vm::run_program(&instrs, input.to_vec()).unwrap()
}

#[test]
fn write_literal() {
    assert_eq!(run_source("DECLARE a; IN WRITE 42; END", &[]), vec![42]);
}

#[test]
fn assignment_and_addition() {
    let out = run_source(
        "DECLARE a; b; IN a := 3; b := a + 5; WRITE b; END",
        &[],
    );
    assert_eq!(out, vec![8]);
}

#[test]
fn subtraction_saturates_at_zero() {
    let out = run_source(
        "DECLARE a; IN a := 7; a := a - 10; WRITE a; END",
        &[],
    );
    assert_eq!(out, vec![0]);
}

#[test]
fn read_feeds_multiplication() {
    let src = "DECLARE a; b; IN READ a; READ b; a := a * b; WRITE a; END";
    assert_eq!(run_source(src, &[6, 7]), vec![42]);
    assert_eq!(run_source(src, &[0, 9]), vec![0]);
    assert_eq!(run_source(src, &[9, 0]), vec![0]);
    assert_eq!(run_source(src, &[1234, 5678]), vec![1234 * 5678]);
}

#[test]
fn division_and_modulo() {
    let src = "DECLARE a; b; q; r; IN \
               READ a; READ b; \
               q := a / b; r := a % b; \
               WRITE q; WRITE r; \
               END";
    assert_eq!(run_source(src, &[22, 7]), vec![3, 1]);
    assert_eq!(run_source(src, &[7, 22]), vec![0, 7]);
    assert_eq!(run_source(src, &[36, 6]), vec![6, 0]);
    assert_eq!(run_source(src, &[1, 1]), vec![1, 0]);
}

#[test]
fn division_by_zero_yields_zeros() {
    let src = "DECLARE a; q; r; IN \
               READ a; q := a / 0; r := a % 0; \
               WRITE q; WRITE r; \
               END";
    assert_eq!(run_source(src, &[17]), vec![0, 0]);
}

#[test]
fn if_takes_the_true_branch_only() {
    let src = "DECLARE a; IN \
               READ a; \
               IF a > 5 THEN WRITE 1; ENDIF \
               WRITE 9; \
               END";
    assert_eq!(run_source(src, &[6]), vec![1, 9]);
    assert_eq!(run_source(src, &[5]), vec![9]);
}

#[test]
fn if_else_covers_both_branches() {
    let src = "DECLARE a; b; IN \
               READ a; READ b; \
               IF a = b THEN WRITE 1; ELSE WRITE 0; ENDIF \
               IF a != b THEN WRITE 1; ELSE WRITE 0; ENDIF \
               IF a <= b THEN WRITE 1; ELSE WRITE 0; ENDIF \
               IF a >= b THEN WRITE 1; ELSE WRITE 0; ENDIF \
               IF a < b THEN WRITE 1; ELSE WRITE 0; ENDIF \
               IF a > b THEN WRITE 1; ELSE WRITE 0; ENDIF \
               END";
    assert_eq!(run_source(src, &[4, 4]), vec![1, 0, 1, 1, 0, 0]);
    assert_eq!(run_source(src, &[3, 4]), vec![0, 1, 1, 0, 1, 0]);
    assert_eq!(run_source(src, &[5, 4]), vec![0, 1, 0, 1, 0, 1]);
    // Zero against zero exercises the saturating comparisons.
    assert_eq!(run_source(src, &[0, 0]), vec![1, 0, 1, 1, 0, 0]);
}

#[test]
fn while_counts_down() {
    let src = "DECLARE a; IN \
               a := 4; \
               WHILE a > 0 DO WRITE a; a := a - 1; ENDWHILE \
               END";
    assert_eq!(run_source(src, &[]), vec![4, 3, 2, 1]);
}

#[test]
fn while_with_false_condition_never_runs() {
    let src = "DECLARE a; IN \
               WHILE a > 0 DO WRITE a; a := a - 1; ENDWHILE \
               WRITE 7; \
               END";
    assert_eq!(run_source(src, &[]), vec![7]);
}

#[test]
fn do_while_runs_at_least_once() {
    let src = "DECLARE a; IN \
               a := 5; \
               DO WRITE a; a := 0; WHILE a > 7 ENDDO \
               END";
    assert_eq!(run_source(src, &[]), vec![5]);
}

#[test]
fn do_while_repeats_until_false() {
    let src = "DECLARE a; IN \
               a := 3; \
               DO WRITE a; a := a - 1; WHILE a > 0 ENDDO \
               END";
    assert_eq!(run_source(src, &[]), vec![3, 2, 1]);
}

#[test]
fn for_walks_the_range_inclusively() {
    let src = "DECLARE x; IN \
               FOR i FROM 1 TO 3 DO WRITE i; ENDFOR \
               END";
    assert_eq!(run_source(src, &[]), vec![1, 2, 3]);
}

#[test]
fn empty_for_range_runs_zero_times() {
    let src = "DECLARE x; IN \
               FOR i FROM 5 TO 3 DO WRITE i; ENDFOR \
               WRITE 1; \
               END";
    assert_eq!(run_source(src, &[]), vec![1]);
}

#[test]
fn downto_reaches_zero_and_stops() {
    let src = "DECLARE x; IN \
               FOR i FROM 3 DOWNTO 0 DO WRITE i; ENDFOR \
               END";
    assert_eq!(run_source(src, &[]), vec![3, 2, 1, 0]);
}

#[test]
fn empty_downto_range_runs_zero_times() {
    let src = "DECLARE x; IN \
               FOR i FROM 2 DOWNTO 5 DO WRITE i; ENDFOR \
               WRITE 1; \
               END";
    assert_eq!(run_source(src, &[]), vec![1]);
}

#[test]
fn for_bound_is_snapshotted_before_the_loop() {
    let src = "DECLARE n; IN \
               n := 3; \
               FOR i FROM 1 TO n DO n := 10; WRITE i; ENDFOR \
               END";
    assert_eq!(run_source(src, &[]), vec![1, 2, 3]);
}

#[test]
fn nested_for_loops() {
    let src = "DECLARE s; IN \
               s := 0; \
               FOR i FROM 1 TO 3 DO \
                 FOR j FROM 1 TO 3 DO \
                   s := s + i; \
                 ENDFOR \
               ENDFOR \
               WRITE s; \
               END";
    // Each i is added three times: 3 * (1 + 2 + 3).
    assert_eq!(run_source(src, &[]), vec![18]);
}

#[test]
fn factorial_via_for() {
    let src = "DECLARE n; f; IN \
               READ n; \
               f := 1; \
               FOR i FROM 1 TO n DO f := f * i; ENDFOR \
               WRITE f; \
               END";
    assert_eq!(run_source(src, &[5]), vec![120]);
    assert_eq!(run_source(src, &[0]), vec![1]);
    assert_eq!(run_source(src, &[10]), vec![3628800]);
}

#[test]
fn array_literal_subscripts() {
    let src = "DECLARE t(1:5); IN \
               t(1) := 9; t(5) := 11; \
               WRITE t(1); WRITE t(5); WRITE t(3); \
               END";
    assert_eq!(run_source(src, &[]), vec![9, 11, 0]);
}

#[test]
fn array_variable_subscripts_honor_the_lower_bound() {
    let src = "DECLARE t(3:5); IN \
               FOR i FROM 3 TO 5 DO t(i) := i; ENDFOR \
               WRITE t(3); WRITE t(4); WRITE t(5); \
               END";
    assert_eq!(run_source(src, &[]), vec![3, 4, 5]);
}

#[test]
fn array_cells_do_not_alias() {
    let src = "DECLARE t(0:9); j; IN \
               READ j; \
               t(j) := 1; \
               t(7) := 2; \
               WRITE t(j); WRITE t(7); \
               END";
    assert_eq!(run_source(src, &[4]), vec![1, 2]);
    // Writing through the variable subscript hits the same cell the
    // literal subscript reads.
    assert_eq!(run_source(src, &[7]), vec![2, 2]);
}

#[test]
fn reversing_input_through_an_array() {
    let src = "DECLARE t(1:4); IN \
               FOR i FROM 1 TO 4 DO READ t(i); ENDFOR \
               FOR i FROM 4 DOWNTO 1 DO WRITE t(i); ENDFOR \
               END";
    assert_eq!(run_source(src, &[10, 20, 30, 40]), vec![40, 30, 20, 10]);
}

#[test]
fn binary_digit_count() {
    let src = "DECLARE n; c; IN \
               READ n; \
               c := 0; \
               WHILE n > 0 DO n := n / 2; c := c + 1; ENDWHILE \
               WRITE c; \
               END";
    assert_eq!(run_source(src, &[1]), vec![1]);
    assert_eq!(run_source(src, &[255]), vec![8]);
    assert_eq!(run_source(src, &[256]), vec![9]);
}

#[test]
fn gcd_by_modulo() {
    let src = "DECLARE a; b; r; IN \
               READ a; READ b; \
               WHILE b > 0 DO \
                 r := a % b; \
                 a := b; \
                 b := r; \
               ENDWHILE \
               WRITE a; \
               END";
    assert_eq!(run_source(src, &[48, 36]), vec![12]);
    assert_eq!(run_source(src, &[17, 5]), vec![1]);
    assert_eq!(run_source(src, &[0, 9]), vec![9]);
}

#[test]
fn compiled_text_is_stable_across_compiles() {
    let src = "DECLARE a; t(1:8); IN \
               READ a; \
               FOR i FROM 1 TO 8 DO t(i) := a * i; ENDFOR \
               WRITE t(8); \
               END";
    let program = parser::parse(src).unwrap();
    let first = codegen::compile(
        &program,
        codegen::declare_program(&program).unwrap(),
    )
    .unwrap();
    let second = codegen::compile(
        &program,
        codegen::declare_program(&program).unwrap(),
    )
    .unwrap();
    assert_eq!(first, second);
}

#[test]
fn out_of_range_literal_subscript_fails_compilation() {
    let program = parser::parse("DECLARE t(2:4); IN t(5) := 1; END").unwrap();
    let table = codegen::declare_program(&program).unwrap();
    let err = codegen::compile(&program, table).unwrap_err();
    assert!(matches!(err, codegen::CodegenError::IndexOutOfRange { .. }));
}

#[test]
fn undeclared_variable_fails_compilation() {
    let program =
        parser::parse("DECLARE a; IN a := ghost; END").unwrap();
    let table = codegen::declare_program(&program).unwrap();
    let err = codegen::compile(&program, table).unwrap_err();
    assert!(matches!(err, codegen::CodegenError::UnboundVariable { .. }));
}
