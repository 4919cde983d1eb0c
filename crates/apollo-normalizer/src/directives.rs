use crate::VariableValues;
use apollo_compiler::ast::Value;
use apollo_compiler::executable::DirectiveList;

/// Returns whether a selection with these directives is kept after evaluating `@skip` and `@include`.
///
/// The two directives are evaluated independently:
/// a selection is dropped if `@skip(if:)` is true or if `@include(if:)` is false.
/// <https://spec.graphql.org/October2021/#sec--skip>
pub fn selection_survives(directives: &DirectiveList, variables: &VariableValues) -> bool {
    !eval_if_arg(directives, "skip", variables).unwrap_or(false)
        && eval_if_arg(directives, "include", variables).unwrap_or(true)
}

fn eval_if_arg(
    directives: &DirectiveList,
    directive_name: &str,
    variables: &VariableValues,
) -> Option<bool> {
    let condition = directives
        .get(directive_name)?
        .specified_argument_by_name("if")?;
    match &**condition {
        Value::Boolean(value) => Some(*value),
        Value::Variable(var) => variables.get(var.as_str())?.as_bool(),
        _ => None,
    }
}
