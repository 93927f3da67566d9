//! Import semantics.
//!
//! Fixture modules live under `tests/fixtures/`; integration tests run with
//! the package root as working directory.

use super::{assert_error, assert_path};

#[test]
fn imported_functions_are_callable() {
    assert_path(
        "import \"tests/fixtures/shapes.tp\"\nsquare(side)",
        "M0 0 L10 0 L10 10 L0 10 L0 0",
    );
}

#[test]
fn imported_constants_fold() {
    assert_path("import \"tests/fixtures/shapes.tp\"\nf side", "M0 0 L10 0");
}

#[test]
fn single_quoted_import_path_works() {
    assert_path("import 'tests/fixtures/shapes.tp'\nf side", "M0 0 L10 0");
}

#[test]
fn importing_twice_is_a_no_op() {
    assert_path(
        "import \"tests/fixtures/shapes.tp\"\nimport \"tests/fixtures/shapes.tp\"\nf side",
        "M0 0 L10 0",
    );
}

#[test]
fn modules_may_import_modules() {
    assert_path(
        "import \"tests/fixtures/nested.tp\"\nbig_square",
        "M0 0 L20 0 L20 20 L0 20 L0 0",
    );
}

#[test]
fn statements_in_modules_are_rejected() {
    assert_error(
        "import \"tests/fixtures/bad_module.tp\"",
        "Statements are not allowed in imported modules",
    );
}

#[test]
fn unreadable_module_is_reported() {
    assert_error(
        "import \"tests/fixtures/does_not_exist.tp\"",
        "Importing tests/fixtures/does_not_exist.tp:",
    );
}

#[test]
fn import_below_global_scope_is_rejected() {
    assert_error(
        "def g() { import \"tests/fixtures/shapes.tp\" }",
        "Import statements are only allowed at the global level",
    );
}

#[test]
fn empty_import_name_is_rejected() {
    assert_error("import \"\"", "Empty import module name");
}

#[test]
fn duplicate_imported_names_are_reported() {
    assert_error(
        "side = 1\nimport \"tests/fixtures/shapes.tp\"",
        "Some names were duplicates, and could not be imported: side",
    );
}

#[test]
fn unterminated_import_path_is_reported() {
    assert_error("import \"tests/fixtures", "Unterminated string constant");
}
