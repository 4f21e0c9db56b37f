use slate::{
    environment::Environment,
    error::{Error, Result},
    runtime::{interpret, Value},
    stdlib::create_standard_env,
    tokenizer::{tokenize, TokenKind},
};

fn eval(source: &str) -> Result<Option<Value>> {
    Ok(interpret(source, &create_standard_env())?.value)
}

fn number(n: f64) -> Option<Value> {
    Some(Value::Number(n))
}

#[test]
fn lexes_scientific_notation() -> Result<()> {
    let tokens = tokenize("12.5e-3")?;
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::Number(0.0125));
    Ok(())
}

#[test]
fn rejects_malformed_numbers() {
    assert!(matches!(tokenize("1.2.3"), Err(Error::Lex { .. })));
    assert!(matches!(tokenize("1e"), Err(Error::Lex { .. })));
    assert!(matches!(eval("var x = 1e"), Err(Error::Lex { .. })));
}

#[test]
fn binary_operators_share_one_precedence() -> Result<()> {
    assert_eq!(eval("2 + 3 * 4")?, number(20.0));
    assert_eq!(eval("2 * 3 + 4")?, number(10.0));
    assert_eq!(eval("2 ** 3 ** 2")?, number(64.0));
    assert_eq!(eval("2 + (3 * 4)")?, number(14.0));
    Ok(())
}

#[test]
fn root_returns_trailing_expression() -> Result<()> {
    assert_eq!(eval("var x = 5\nx")?, number(5.0));
    assert_eq!(eval("var x = 5")?, None);
    assert_eq!(eval("")?, None);
    assert_eq!(eval("var x = 5\nreturn x + 1\nx")?, number(6.0));
    Ok(())
}

#[test]
fn functions_and_calls() -> Result<()> {
    assert_eq!(eval("func add(a,b){ return a+b }\nadd(2,3)")?, number(5.0));
    assert_eq!(eval("func nothing() { }\nnothing()")?, Some(Value::Undefined));
    assert_eq!(
        eval("func early(a) {\n  return a\n  return 0\n}\nearly(7)")?,
        number(7.0)
    );
    Ok(())
}

#[test]
fn closures_capture_the_defining_frame() -> Result<()> {
    let source = "
        func make_adder(n) {
            func add(x) { return x + n }
            return add
        }
        var add5 = make_adder(5)
        var add10 = make_adder(10)
        add5(1) * add10(1)
    ";
    assert_eq!(eval(source)?, number(66.0));

    // the caller's frame is not visible to the callee
    let source = "
        func peek() { return hidden }
        func outer() {
            var hidden = 1
            return peek()
        }
        outer()
    ";
    assert!(matches!(eval(source), Err(Error::Name { .. })));
    Ok(())
}

#[test]
fn redeclaration_and_shadowing() -> Result<()> {
    assert!(matches!(eval("var x=1; var x=2"), Err(Error::Name { .. })));
    assert!(matches!(
        eval("func f(a, a) { return a }\nf(1, 2)"),
        Err(Error::Name { .. })
    ));

    assert_eq!(eval("var x = 1\n{ var x = 2 }\nx")?, number(1.0));
    assert_eq!(
        eval("var x = 1\nfunc f(x) { var y = x * 2\n return y }\nf(4) + x")?,
        number(9.0)
    );
    Ok(())
}

#[test]
fn argument_count() -> Result<()> {
    match eval("func f(a, b) { return a }\nf(1)") {
        Err(Error::Arity {
            required, supplied, ..
        }) => assert_eq!((required, supplied), (2, 1)),
        other => panic!("Expected arity error, got {:?}", other),
    }

    assert_eq!(eval("func f(a, b) { return a + b }\nf(1, 2, 3)")?, number(3.0));
    assert!(matches!(eval("sqrt()"), Err(Error::Arity { .. })));
    Ok(())
}

#[test]
fn unary_operators() -> Result<()> {
    assert_eq!(eval("|-5|")?, number(5.0));
    assert_eq!(eval("|2 - 10|")?, number(8.0));
    assert_eq!(eval("-7 // 2")?, number(-4.0));
    assert_eq!(eval("7 // 2")?, number(3.0));
    assert_eq!(eval("+3")?, number(3.0));
    Ok(())
}

#[test]
fn standard_library() -> Result<()> {
    assert_eq!(eval("floor(pi)")?, number(3.0));
    assert_eq!(eval("max(1, 7, 3)")?, number(7.0));
    assert_eq!(eval("sqrt(16) + abs(-2)")?, number(6.0));
    assert!(matches!(eval("sqrt(sqrt)"), Err(Error::Type { .. })));
    Ok(())
}

#[test]
fn random_range_reports_unusable_bounds() {
    for source in [
        "random_range(0, inf)",
        "random_range(-inf, 0)",
        "random_range(-1e308, 1e308)",
    ] {
        assert!(
            matches!(eval(source), Err(Error::Type { .. })),
            "{} should be a type error",
            source
        );
    }
}

#[test]
fn type_errors() {
    assert!(matches!(eval("var x = 1\nx(2)"), Err(Error::Type { .. })));
    assert!(matches!(eval("func f() { }\nf + 1"), Err(Error::Type { .. })));
    assert!(matches!(eval("func f() { }\n1 - f"), Err(Error::Type { .. })));
    assert!(matches!(eval("var u\n-u"), Err(Error::Type { .. })));
}

#[test]
fn diagnostics_point_at_the_offending_token() {
    let source = "var x = 1\nx + y";
    match eval(source) {
        Err(err) => assert_eq!(
            err.render(source),
            "[ERROR] Unknown value: 'y':\nx + y\n    ^ On line 2, column 5\n"
        ),
        other => panic!("Expected name error, got {:?}", other),
    }

    let source = "var 1 = 2";
    match eval(source) {
        Err(err @ Error::Parse { .. }) => {
            assert!(err.render(source).contains("On line 1, column 5"))
        }
        other => panic!("Expected parse error, got {:?}", other),
    }
}

#[test]
fn scope_carries_across_units() -> Result<()> {
    let env = create_standard_env();

    let first = interpret("var a = 2\nfunc double(n) { return n * 2 }", &env)?;
    assert_eq!(first.value, None);
    assert_eq!(first.declared, vec!["a".to_string(), "double".to_string()]);

    let second = interpret("double(a)", &env)?;
    assert_eq!(second.value, number(4.0));
    assert!(second.declared.is_empty());

    assert!(matches!(interpret("var a = 3", &env), Err(Error::Name { .. })));
    assert_eq!(env.get("a"), Some(Value::Number(2.0)));
    Ok(())
}

#[test]
fn failed_units_keep_earlier_declarations() -> Result<()> {
    let env = Environment::new();
    assert!(interpret("var kept = 1\nmissing", &env).is_err());
    assert_eq!(interpret("kept", &env)?.value, number(1.0));
    Ok(())
}
