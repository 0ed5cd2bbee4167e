//! Property tests: the parser is total (no panics) and arithmetic
//! agrees with f64.

use cascade_expression::ExpressionEngine;
use cascade_value::{Object, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn parsing_arbitrary_input_never_panics(input in "\\PC{0,64}") {
        let _ = ExpressionEngine::new().parse(&input);
    }

    #[test]
    fn evaluating_arbitrary_input_never_panics(input in "\\PC{0,64}") {
        let _ = ExpressionEngine::new().evaluate(&input, &Object::new());
    }

    #[test]
    fn addition_agrees_with_f64(a in -1_000i32..1_000, b in -1_000i32..1_000) {
        let result = ExpressionEngine::new()
            .evaluate(&format!("{a} + {b}"), &Object::new())
            .unwrap();
        prop_assert_eq!(result, Value::number(f64::from(a) + f64::from(b)));
    }

    #[test]
    fn multiplication_agrees_with_f64(a in -1_000i32..1_000, b in -1_000i32..1_000) {
        let result = ExpressionEngine::new()
            .evaluate(&format!("{a} * {b}"), &Object::new())
            .unwrap();
        prop_assert_eq!(result, Value::number(f64::from(a) * f64::from(b)));
    }

    #[test]
    fn ordering_agrees_with_integers(a in -100i32..100, b in -100i32..100) {
        let engine = ExpressionEngine::new();
        let vars = Object::new();
        prop_assert_eq!(
            engine.evaluate(&format!("{a} < {b}"), &vars).unwrap(),
            Value::boolean(a < b)
        );
        prop_assert_eq!(
            engine.evaluate(&format!("{a} >= {b}"), &vars).unwrap(),
            Value::boolean(a >= b)
        );
    }

    #[test]
    fn equality_is_reflexive_for_numbers(a in -1_000i32..1_000) {
        let result = ExpressionEngine::new()
            .evaluate(&format!("{a} == {a}"), &Object::new())
            .unwrap();
        prop_assert_eq!(result, Value::boolean(true));
    }
}
