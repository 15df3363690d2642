//! Integration tests for the Vela back end
//!
//! This crate drives the complete pipeline end to end:
//! Typed AST → type elaboration → IR lowering → flow reconstruction → C

use vela_codegen::{CBackend, CodeGen};
use vela_error::{Diagnostic, Diagnostics};
use vela_front::Unit;
use vela_lower::{lower_unit, LoweredUnit};

/// Result of compiling one unit
#[derive(Debug)]
pub struct CompileResult {
    /// Whether compilation succeeded without errors
    pub success: bool,
    /// Any diagnostics (errors/warnings) produced
    pub diagnostics: Diagnostics,
    /// Generated C code (if successful)
    pub c_code: Option<String>,
    /// Generated IR (for debugging)
    pub ir_debug: Option<String>,
}

/// Compiles a resolved unit through the full back end
pub fn compile(unit: &Unit) -> CompileResult {
    // Phase 1: type elaboration and lowering to IR
    let LoweredUnit { module, mut diagnostics } = match lower_unit(unit) {
        Ok(lowered) => lowered,
        Err(err) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(Diagnostic::internal(err));
            return CompileResult {
                success: false,
                diagnostics,
                c_code: None,
                ir_debug: None,
            };
        }
    };
    let ir_debug = format!("{}", module);
    if diagnostics.has_errors() {
        return CompileResult {
            success: false,
            diagnostics,
            c_code: None,
            ir_debug: Some(ir_debug),
        };
    }

    // Phase 2: flow reconstruction and C generation
    let backend = CBackend::new();
    match backend.generate(&module) {
        Ok(c_code) => CompileResult {
            success: true,
            diagnostics,
            c_code: Some(c_code),
            ir_debug: Some(ir_debug),
        },
        Err(err) => {
            diagnostics.push(Diagnostic::internal(err));
            CompileResult {
                success: false,
                diagnostics,
                c_code: None,
                ir_debug: Some(ir_debug),
            }
        }
    }
}

/// Asserts that a unit compiles without errors
pub fn assert_compiles(unit: &Unit) {
    let result = compile(unit);
    if !result.success {
        panic!(
            "Expected unit to compile, but got errors:\n{:?}",
            result.diagnostics
        );
    }
}

/// Asserts that a unit fails to compile with errors
pub fn assert_compile_fails(unit: &Unit) {
    let result = compile(unit);
    if result.success {
        panic!("Expected unit to fail compilation, but it succeeded");
    }
}

/// Asserts that a unit compiles and the C output contains a specific string
pub fn assert_c_contains(unit: &Unit, expected: &str) {
    let result = compile(unit);
    if !result.success {
        panic!(
            "Expected unit to compile, but got errors:\n{:?}",
            result.diagnostics
        );
    }
    let c_code = result.c_code.unwrap();
    if !c_code.contains(expected) {
        panic!(
            "Expected C output to contain '{}', but it didn't.\n\nGenerated code:\n{}",
            expected, c_code
        );
    }
}

/// Asserts that a unit compiles and the IR contains a specific string
pub fn assert_ir_contains(unit: &Unit, expected: &str) {
    let result = compile(unit);
    if !result.success {
        panic!(
            "Expected unit to compile, but got errors:\n{:?}",
            result.diagnostics
        );
    }
    let ir_debug = result.ir_debug.unwrap();
    if !ir_debug.contains(expected) {
        panic!(
            "Expected IR to contain '{}', but it didn't.\n\nGenerated IR:\n{}",
            expected, ir_debug
        );
    }
}


#[cfg(test)]
mod representation_tests {
    use super::*;
    use vela_error::ErrorCode;
    use vela_front::{Expr, Field, FunctionDecl, RepClause, Stmt};

    // =========================================
    // Size and bias clauses
    // =========================================

    #[test]
    fn test_biased_subtype_stores_offset() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -1000, 1000);
        let base = unit.types.add_integer("Level", 10, 17);
        let biased = unit.types.add_subtype("Packed_Level", base, None, None);
        unit.types.set_rep(biased, RepClause::biased(3));
        unit.functions.push(
            FunctionDecl::new("f", None)
                .with_local("v", biased)
                .with_local("x", int)
                .with_body(vec![
                    Stmt::Assign {
                        target: Expr::name("v", biased),
                        value: Expr::int(12, biased),
                    },
                    Stmt::Assign {
                        target: Expr::name("x", int),
                        value: Expr::name("v", biased),
                    },
                ]),
        );

        let result = compile(&unit);
        assert!(result.success);
        let c = result.c_code.unwrap();
        // 12 stores as the offset from the low bound
        assert!(c.contains("v = 2;"));
        // reading it back adds the bias
        assert!(c.contains("+ 10;"));
    }

    #[test]
    fn test_size_clause_widens_storage() {
        let mut unit = Unit::new("t");
        let level = unit.types.add_integer("Level", 0, 100);
        unit.types.set_rep(level, RepClause::sized(16));
        unit.functions.push(
            FunctionDecl::new("f", None)
                .with_local("v", level)
                .with_body(vec![Stmt::Assign {
                    target: Expr::name("v", level),
                    value: Expr::int(5, level),
                }]),
        );

        assert_c_contains(&unit, "uint16_t v;");
        assert_c_contains(&unit, "v = 5;");
    }

    #[test]
    fn test_size_clause_too_small_fails() {
        let mut unit = Unit::new("t");
        let level = unit.types.add_integer("Level", 0, 100);
        unit.types.set_rep(level, RepClause::sized(4));

        let result = compile(&unit);
        assert!(!result.success);
        assert!(result.ir_debug.is_some());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("too small")));
    }

    #[test]
    fn test_record_size_clause_too_small_fails() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -100000, 100000);
        let rec = unit.types.add_record(
            "Pair",
            vec![
                Field { name: "x".into(), ty: int },
                Field { name: "y".into(), ty: int },
            ],
            false,
        );
        unit.types.set_rep(rec, RepClause::sized(16));

        assert_compile_fails(&unit);
    }

    #[test]
    fn test_rep_clause_on_float_is_rejected() {
        let mut unit = Unit::new("t");
        let short = unit.types.add_float("Short_Float", 32);
        unit.types.set_rep(short, RepClause::sized(16));

        let result = compile(&unit);
        assert!(!result.success);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == Some(ErrorCode::UNSUPPORTED_REP)));
    }

    #[test]
    fn test_packed_record_renders_bit_fields() {
        let mut unit = Unit::new("t");
        let boolean = unit.types.add_boolean("Boolean");
        let small = unit.types.add_integer("Small", 0, 7);
        unit.types.add_record(
            "Flags",
            vec![
                Field { name: "on".into(), ty: boolean },
                Field { name: "level".into(), ty: small },
            ],
            true,
        );

        let result = compile(&unit);
        assert!(result.success);
        let c = result.c_code.unwrap();
        assert!(c.contains("typedef struct __attribute__((packed)) Flags {"));
        assert!(c.contains("unsigned on : 1;"));
        assert!(c.contains("unsigned level : 3;"));
        assert!(c.contains("} Flags;"));
    }

    // =========================================
    // Checked conversions
    // =========================================

    #[test]
    fn test_checked_conversion_calls_range_helper() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -100000, 100000);
        let small = unit.types.add_integer("Small", 0, 100);
        unit.functions.push(
            FunctionDecl::new("clamp", Some(small))
                .with_param("x", int)
                .with_body(vec![Stmt::Return(Some(
                    Expr::convert_checked(small, Expr::name("x", int)).at(4, 9),
                ))]),
        );

        let result = compile(&unit);
        assert!(result.success);
        assert_eq!(result.diagnostics.len(), 0);
        let c = result.c_code.unwrap();
        assert!(c.contains("uint8_t clamp(int32_t x) {"));
        // the operand widens to the helper's argument width
        assert!(c.contains("int64_t t0 = (int64_t)(x);"));
        assert!(c.contains("__vela_check_range(t0, 0, 100, 4);"));
        assert!(c.contains("uint8_t t1 = (uint8_t)(x);"));
        assert!(c.contains("return t1;"));
    }

    #[test]
    fn test_constant_out_of_range_warns_and_raises() {
        let mut unit = Unit::new("t");
        let int = unit.types.add_integer("Int", -100000, 100000);
        let small = unit.types.add_integer("Small", 0, 100);
        unit.functions.push(
            FunctionDecl::new("overflowing", Some(small)).with_body(vec![Stmt::Return(Some(
                Expr::convert_checked(small, Expr::int(500, int)).at(7, 3),
            ))]),
        );

        let result = compile(&unit);
        assert!(result.success);
        assert_eq!(result.diagnostics.len(), 1);
        let diag = result.diagnostics.iter().next().unwrap();
        assert_eq!(diag.code, Some(ErrorCode::RANGE_CHECK_FAILS));
        assert!(!diag.labels.is_empty());
        let c = result.c_code.unwrap();
        // the check degrades to an unconditional raise
        assert!(c.contains("__vela_raise_range(0, 100, 7);"));
        assert!(c.contains("return 500;"));
    }
}


#[cfg(test)]
mod interchange_tests {
    use super::*;
    use vela_front::{Expr, FunctionDecl, RepClause, Stmt};

    #[test]
    fn test_unit_round_trips_through_json_file() {
        let mut unit = Unit::new("disk");
        let int = unit.types.add_integer("Int", -1000, 1000);
        unit.functions.push(
            FunctionDecl::new("answer", Some(int))
                .with_body(vec![Stmt::Return(Some(Expr::int(5, int)))]),
        );

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_json::to_string_pretty(&unit).unwrap()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let back: Unit = serde_json::from_str(&text).unwrap();

        let direct = compile(&unit);
        let reloaded = compile(&back);
        assert!(reloaded.success);
        assert_eq!(direct.c_code, reloaded.c_code);
        assert_eq!(direct.ir_debug, reloaded.ir_debug);
    }

    #[test]
    fn test_rep_clauses_survive_serialization() {
        let mut unit = Unit::new("disk");
        let base = unit.types.add_integer("Level", 10, 17);
        let biased = unit.types.add_subtype("Packed_Level", base, None, None);
        unit.types.set_rep(biased, RepClause::biased(3));
        unit.functions.push(
            FunctionDecl::new("f", None)
                .with_local("v", biased)
                .with_body(vec![Stmt::Assign {
                    target: Expr::name("v", biased),
                    value: Expr::int(12, biased),
                }]),
        );

        let json = serde_json::to_string(&unit).unwrap();
        let back: Unit = serde_json::from_str(&json).unwrap();
        let result = compile(&back);
        assert!(result.success);
        // the bias clause still folds the stored constant
        assert!(result.c_code.unwrap().contains("v = 2;"));
    }
}
