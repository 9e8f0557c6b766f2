//! End-to-end tests driving the public pipeline from source text to
//! assembly, mirroring how the CLI driver uses the crate.

use a64cc::{CompileError, compile, parser, tokenizer, ty};

#[test]
fn compiles_a_minimal_function() {
  let asm = compile("int main(){int a; a=3; return a+2;}").unwrap();
  assert!(asm.starts_with("\t.global _main\n_main:\n"));
  assert!(asm.contains("\tstp\tfp, lr, [sp, #-16]! // prologue\n"));
  assert!(asm.contains("\tsub\tsp, sp, #16\n"));
  assert!(asm.trim_end().ends_with("\tret"));
}

#[test]
fn compiles_a_call_to_a_function_defined_later() {
  // Call targets are resolved by the linker; no declaration is needed.
  let asm = compile("int main(){return f(21);} int f(int x){return x*2;}").unwrap();
  assert!(asm.contains("\tbl\t_f // call\n"));
  assert!(asm.contains("\t.global _f\n"));
}

#[test]
fn compiles_pointer_store_and_load() {
  let asm = compile("int main(){int *p; int a; p=&a; *p=5; return a;}").unwrap();
  assert!(asm.contains("\tstr\tx1, [x0] // store\n"));
  assert!(asm.contains("\tldr\tx0, [x0] // load value\n"));
}

#[test]
fn dereferencing_an_integer_fails_before_any_code_is_emitted() {
  let err = compile("int main(){return *3;}").unwrap_err();
  assert!(matches!(err, CompileError::Type { .. }));
  assert!(err.to_string().contains("invalid pointer dereference"));
}

#[test]
fn pointer_arithmetic_is_unscaled() {
  // Known simplification kept from the reference behavior: p + 1 advances
  // by one storage unit, not by sizeof(int). The addition must lower to a
  // plain add with no scaling of the integer operand.
  let asm = compile("int main(){int *p; int a; p=&a; return *(p+0);}").unwrap();
  assert!(asm.contains("\tadd\tx0, x0, x1\n"));
  assert!(!asm.contains("lsl"));
}

#[test]
fn control_flow_round_trip() {
  let source = "
    int sum(int n){
      int total;
      int i;
      total = 0;
      for (i = 1; i <= n; i = i + 1)
        total = total + i;
      return total;
    }
    int main(){
      if (sum(10) == 55)
        return 0;
      else
        return 1;
    }
  ";
  let asm = compile(source).unwrap();
  assert!(asm.contains(".Lbegin0_sum:"));
  assert!(asm.contains(".Lelse0_main:"));
  assert!(asm.contains("\tcset\tw0, eq\n"));
  assert!(asm.contains("\tcset\tw0, le\n"));
}

#[test]
fn diagnostics_anchor_the_failing_line() {
  let err = compile("int main(){\n  return 1 +;\n}").unwrap_err();
  let rendered = err.to_string();
  let mut lines = rendered.lines();
  assert_eq!(lines.next(), Some("  return 1 +;"));
  let marker = lines.next().unwrap();
  assert_eq!(marker.find('^'), Some("  return 1 +".len()));
  assert!(marker.contains("expected a number"));
}

#[test]
fn stage_functions_are_independently_callable() {
  let source = "int main(){return 0;}";
  let tokens = tokenizer::tokenize(source).unwrap();
  assert!(!tokenizer::dump_tokens(&tokens, source).is_empty());

  let mut program = parser::parse(tokens, source).unwrap();
  let untyped = program[0].dump();
  assert!(!untyped.contains(":int"));

  ty::annotate(&mut program, source).unwrap();
  let typed = program[0].dump();
  assert!(typed.contains(":int"));
}

#[test]
fn six_arguments_reach_six_registers() {
  let asm = compile("int main(){return f(1,2,3,4,5,6);}").unwrap();
  for reg in ["x0", "x1", "x2", "x3", "x4", "x5"] {
    assert!(
      asm.contains(&format!("\tldr\t{reg}, [sp], #16")),
      "argument register {reg} never loaded"
    );
  }
}

#[test]
fn lexical_error_reports_the_offending_character() {
  let err = compile("int main(){return 1 @ 2;}").unwrap_err();
  assert!(matches!(err, CompileError::Lexical { .. }));
  assert!(err.to_string().contains("invalid token: '@'"));
}
