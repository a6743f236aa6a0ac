use crate::capture::CompletedCalculation;
use crate::evaluator::Operator;

/// Formats a result for display: integers without a fraction, everything
/// else to two decimals.
pub fn format_result(result: f64) -> String {
    if result.is_nan() {
        "undefined".to_string()
    } else if result.fract() == 0.0 {
        format!("{}", result as i64)
    } else {
        format!("{result:.2}")
    }
}

/// Sentence for a speech collaborator, e.g. "3 plus 2 equals 5".
pub fn narrate(calc: &CompletedCalculation) -> String {
    let a = calc.first_operand;
    let b = calc.second_operand;
    if calc.operator == Operator::Divide && (b == 0 || calc.result.is_nan()) {
        return format!("Cannot divide {a} by zero");
    }
    format!(
        "{a} {} {b} equals {}",
        calc.operator.spoken(),
        format_result(calc.result)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(a: u8, operator: Operator, b: u8, result: f64) -> CompletedCalculation {
        CompletedCalculation {
            first_operand: a,
            operator,
            second_operand: b,
            result,
        }
    }

    #[test]
    fn whole_results() {
        assert_eq!(narrate(&calc(3, Operator::Add, 2, 5.0)), "3 plus 2 equals 5");
        assert_eq!(narrate(&calc(1, Operator::Subtract, 4, -3.0)), "1 minus 4 equals -3");
        assert_eq!(narrate(&calc(4, Operator::Multiply, 5, 20.0)), "4 times 5 equals 20");
    }

    #[test]
    fn fractional_division_rounds_to_two_places() {
        assert_eq!(
            narrate(&calc(5, Operator::Divide, 3, 5.0 / 3.0)),
            "5 divided by 3 equals 1.67"
        );
    }

    #[test]
    fn divide_by_zero_is_spelled_out() {
        assert_eq!(
            narrate(&calc(6, Operator::Divide, 0, f64::NAN)),
            "Cannot divide 6 by zero"
        );
    }
}
