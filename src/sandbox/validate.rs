use super::ast::{Expr, NodeKind, Stmt};
use super::parser;
use super::RejectionReason;

/// A snippet that survived every whitelist check. Exists only on the success
/// path of [`validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// Run the closed-whitelist validation over a candidate snippet.
///
/// The snippet must parse, contain exactly one plain function definition,
/// and use nothing in its body beyond literals, arithmetic/string
/// expressions, `if`/`return`/`pass`, and calls to the bare name `print`.
/// Anything else is rejected with a diagnostic naming the construct. A body
/// with no call at all still passes: the whitelist constrains what may
/// appear, it does not require a `print` call.
pub fn validate(snippet: &str) -> Result<ParsedFunction, RejectionReason> {
    let stmts =
        parser::parse(snippet).map_err(|err| RejectionReason::SyntaxInvalid(err.to_string()))?;

    // Imports are reported ahead of the structure check so that a stray
    // `import os` before the def is named for what it is.
    for stmt in &stmts {
        match stmt {
            Stmt::Import(_) => {
                return Err(RejectionReason::ForbiddenConstruct(NodeKind::Import));
            }
            Stmt::ImportFrom { .. } => {
                return Err(RejectionReason::ForbiddenConstruct(NodeKind::ImportFrom));
            }
            _ => {}
        }
    }

    if stmts.len() != 1 {
        return Err(RejectionReason::structure_invalid());
    }
    let Some(Stmt::FunctionDef { name, params, body }) = stmts.into_iter().next() else {
        return Err(RejectionReason::structure_invalid());
    };

    for stmt in &body {
        check_stmt(stmt)?;
    }

    Ok(ParsedFunction { name, params, body })
}

fn check_stmt(stmt: &Stmt) -> Result<(), RejectionReason> {
    match stmt {
        Stmt::Expr(expr) => check_expr(expr),
        Stmt::Return(value) => value.as_ref().map(check_expr).unwrap_or(Ok(())),
        Stmt::Pass => Ok(()),
        Stmt::If { test, body, orelse } => {
            check_expr(test)?;
            for s in body.iter().chain(orelse) {
                check_stmt(s)?;
            }
            Ok(())
        }
        // Nested plain defs are not in the banned set; their bodies still
        // have to pass, and nothing inside the sandbox can call them.
        Stmt::FunctionDef { body, .. } => {
            for s in body {
                check_stmt(s)?;
            }
            Ok(())
        }
        Stmt::Import(_) => Err(RejectionReason::ForbiddenConstruct(NodeKind::Import)),
        Stmt::ImportFrom { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::ImportFrom)),
        Stmt::Assign { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::Assign)),
        Stmt::AugAssign { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::AugAssign)),
        Stmt::Global(_) => Err(RejectionReason::ForbiddenConstruct(NodeKind::Global)),
        Stmt::Nonlocal(_) => Err(RejectionReason::ForbiddenConstruct(NodeKind::Nonlocal)),
        Stmt::ClassDef { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::ClassDef)),
        Stmt::AsyncFunctionDef { .. } => {
            Err(RejectionReason::ForbiddenConstruct(NodeKind::AsyncFunctionDef))
        }
        Stmt::While { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::While)),
        Stmt::For { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::For)),
        Stmt::Try { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::Try)),
        Stmt::With { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::With)),
        Stmt::Raise(_) => Err(RejectionReason::ForbiddenConstruct(NodeKind::Raise)),
        Stmt::Delete(_) => Err(RejectionReason::ForbiddenConstruct(NodeKind::Delete)),
    }
}

fn check_expr(expr: &Expr) -> Result<(), RejectionReason> {
    match expr {
        Expr::NoneLit | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::Str(_) => Ok(()),
        Expr::Name(_) => Ok(()),
        Expr::Unary { operand, .. } => check_expr(operand),
        Expr::Binary { left, right, .. }
        | Expr::Compare { left, right, .. }
        | Expr::BoolExpr { left, right, .. } => {
            check_expr(left)?;
            check_expr(right)
        }
        Expr::Call { func, args } => {
            match func.as_ref() {
                Expr::Name(name) if name == "print" => {}
                Expr::Name(name) => {
                    return Err(RejectionReason::ForbiddenCall(name.clone()));
                }
                _ => {
                    return Err(RejectionReason::ForbiddenCall(
                        "computed call target".to_string(),
                    ));
                }
            }
            for arg in args {
                check_expr(arg)?;
            }
            Ok(())
        }
        Expr::Attribute { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::Attribute)),
        Expr::Subscript { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::Subscript)),
        Expr::Lambda { .. } => Err(RejectionReason::ForbiddenConstruct(NodeKind::Lambda)),
        Expr::Comprehension(kind) => Err(RejectionReason::ForbiddenConstruct(*kind)),
        Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => {
            for item in items {
                check_expr(item)?;
            }
            Ok(())
        }
        Expr::Dict(entries) => {
            for (key, value) in entries {
                check_expr(key)?;
                check_expr(value)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_only_body_accepted() {
        let func = validate("def warn(x):\n    print('issue: ' + x)\n").expect("valid");
        assert_eq!(func.name, "warn");
        assert_eq!(func.params, vec!["x".to_string()]);
    }

    #[test]
    fn test_unparseable_snippet() {
        let err = validate("def (:\n").unwrap_err();
        assert!(matches!(err, RejectionReason::SyntaxInvalid(_)));
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = validate("def a():\n    pass\ndef b():\n    pass\n").unwrap_err();
        assert!(matches!(err, RejectionReason::StructureInvalid(_)));
    }

    #[test]
    fn test_bare_expression_rejected() {
        let err = validate("1 + 2\n").unwrap_err();
        assert!(matches!(err, RejectionReason::StructureInvalid(_)));
    }

    #[test]
    fn test_async_def_rejected_as_structure() {
        let err = validate("async def f():\n    pass\n").unwrap_err();
        assert!(matches!(err, RejectionReason::StructureInvalid(_)));
    }

    #[test]
    fn test_top_level_import_named_before_structure() {
        let err = validate("import os\ndef bad():\n    print(os.getcwd())\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::Import));
    }

    #[test]
    fn test_import_inside_body() {
        let err = validate("def f():\n    import os\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::Import));
    }

    #[test]
    fn test_attribute_access_rejected() {
        let err = validate("def f():\n    print(x.y)\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::Attribute));
    }

    #[test]
    fn test_assignment_rejected() {
        let err = validate("def f():\n    x = 1\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::Assign));
    }

    #[test]
    fn test_loop_rejected() {
        let err = validate("def f():\n    while True:\n        pass\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::While));
    }

    #[test]
    fn test_lambda_rejected() {
        let err = validate("def f():\n    return lambda: 1\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::Lambda));
    }

    #[test]
    fn test_comprehension_rejected() {
        let err = validate("def f():\n    return [x for x in items]\n").unwrap_err();
        assert_eq!(err, RejectionReason::ForbiddenConstruct(NodeKind::ListComp));
    }

    #[test]
    fn test_non_print_call_rejected() {
        for target in ["eval", "open", "exec"] {
            let err = validate(&format!("def f():\n    {target}('x')\n")).unwrap_err();
            assert_eq!(err, RejectionReason::ForbiddenCall(target.to_string()));
        }
    }

    #[test]
    fn test_qualified_call_rejected_via_attribute() {
        // The call target is an attribute node; walking reaches the call
        // first and reports the non-bare target.
        let err = validate("def f():\n    print(o.read())\n").unwrap_err();
        assert!(matches!(
            err,
            RejectionReason::ForbiddenCall(_) | RejectionReason::ForbiddenConstruct(NodeKind::Attribute)
        ));
    }

    #[test]
    fn test_body_without_any_call_is_accepted() {
        // Intentional boundary: the whitelist does not require a print call.
        let func = validate("def f():\n    return 1\n").expect("valid");
        assert_eq!(func.name, "f");
    }

    #[test]
    fn test_if_and_arithmetic_accepted() {
        let src = "def f(x):\n    if x > 1:\n        print('big', x * 2)\n    else:\n        print('small')\n";
        assert!(validate(src).is_ok());
    }

    #[test]
    fn test_validation_is_pure() {
        let src = "def warn(x):\n    print('issue: ' + x)\n";
        assert_eq!(validate(src), validate(src));
    }
}
