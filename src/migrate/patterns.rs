//! Shapes of the legacy transform API.

use crate::config::MigrationConfig;
use crate::matcher::{ListPattern, Pattern};

/// `while (row := koza_app.get_row()) is not None:` without an `else` clause.
pub fn row_loop(config: &MigrationConfig) -> Pattern {
    let get_row = Pattern::kind("call")
        .field("function", Pattern::attribute(&config.app_name, "get_row"))
        .field("arguments", Pattern::kind("argument_list").children(vec![]));
    let walrus = Pattern::kind("named_expression")
        .field("name", Pattern::name(&config.row_name))
        .field("value", get_row);

    Pattern::kind("while_statement").without("alternative").field(
        "condition",
        Pattern::kind("comparison_operator")
            .field_list("operators", ListPattern::exact(vec![Pattern::kind("is not")]))
            .children(vec![Pattern::parenthesized(walrus), Pattern::kind("none")]),
    )
}

/// `from koza.cli_utils import get_koza_app`
pub fn factory_import(config: &MigrationConfig) -> Pattern {
    Pattern::kind("import_from_statement")
        .field("module_name", Pattern::kind("dotted_name").text(&config.factory_module))
        .field_list(
            "name",
            ListPattern::exact(vec![Pattern::kind("dotted_name").text(&config.factory)]),
        )
}

/// `koza_app = get_koza_app(...)`
pub fn app_assignment(config: &MigrationConfig) -> Pattern {
    assignment_statement(
        Pattern::name(&config.app_name),
        Pattern::kind("call").field("function", Pattern::name(&config.factory)),
    )
}

/// `m = koza_app.get_map("name")`, capturing `alias` and `map`.
pub fn map_assignment(config: &MigrationConfig) -> Pattern {
    assignment_statement(
        Pattern::kind("identifier").capture("alias"),
        Pattern::kind("call")
            .field("function", Pattern::attribute(&config.app_name, "get_map"))
            .field(
                "arguments",
                Pattern::kind("argument_list").children(vec![Pattern::string().capture("map")]),
            ),
    )
}

/// `koza_app.write(...)`
pub fn app_write(config: &MigrationConfig) -> Pattern {
    Pattern::kind("call").field("function", Pattern::attribute(&config.app_name, "write"))
}

/// Any `<expr>.get(...)` call.
pub fn get_call() -> Pattern {
    Pattern::kind("call").field(
        "function",
        Pattern::kind("attribute").field("attribute", Pattern::name("get")),
    )
}

/// A statement consisting of a single plain assignment.
fn assignment_statement(left: Pattern, right: Pattern) -> Pattern {
    Pattern::kind("expression_statement").children(vec![
        Pattern::kind("assignment")
            .field("left", left)
            .field("right", right)
            .without("type"),
    ])
}
