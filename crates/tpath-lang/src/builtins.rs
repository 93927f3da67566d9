//! The builtin command table.
//!
//! Every turtle command gets a builtin function definition (context depth 0,
//! below the global context) and a builtin chunk whose single statement
//! dispatches the command with arguments read from the frame's parameter
//! slots. Builtins take value parameters only.

use std::collections::BTreeMap;

use tpath_engine::Engine;
use tpath_turtle::TurtleOp;

use crate::names::{NameDef, NameId, NameTable};

/// The command table: name, op, parameter names.
const BUILTIN_COMMANDS: &[(&str, TurtleOp, &[&str])] = &[
    ("rotation", TurtleOp::Rotation, &["angle"]),
    ("scaling", TurtleOp::Scaling, &["x", "y"]),
    ("shearing", TurtleOp::Shearing, &["x", "y"]),
    ("reflection", TurtleOp::Reflection, &["x", "y"]),
    ("translation", TurtleOp::Translation, &["x", "y"]),
    ("push_matrix", TurtleOp::PushMatrix, &[]),
    ("pop_matrix", TurtleOp::PopMatrix, &[]),
    ("z", TurtleOp::Close, &[]),
    ("m", TurtleOp::MoveBy, &["dx", "dy"]),
    ("M", TurtleOp::MoveTo, &["x", "y"]),
    ("r", TurtleOp::Right, &["angle"]),
    ("l", TurtleOp::Left, &["angle"]),
    ("d", TurtleOp::SetDir, &["angle"]),
    ("f", TurtleOp::Forward, &["distance"]),
    ("j", TurtleOp::Jump, &["distance"]),
    ("a", TurtleOp::Arc, &["radius", "angle"]),
    ("q", TurtleOp::QuadBy, &["dx", "dy", "angle"]),
    ("Q", TurtleOp::QuadTo, &["x", "y", "angle"]),
    ("t", TurtleOp::SmoothQuad, &["distance"]),
    (
        "c",
        TurtleOp::CurveBy,
        &["len1", "angle1", "len2", "angle2", "dx", "dy"],
    ),
    (
        "C",
        TurtleOp::CurveTo,
        &["len1", "angle1", "len2", "angle2", "x", "y"],
    ),
    ("s", TurtleOp::SmoothBy, &["len2", "angle2", "dx", "dy"]),
    ("S", TurtleOp::SmoothTo, &["len2", "angle2", "x", "y"]),
    (
        "ah",
        TurtleOp::AdjacentForHypotenuse,
        &["angle", "hypotenuse"],
    ),
    ("ao", TurtleOp::AdjacentForOpposite, &["angle", "opposite"]),
    ("ha", TurtleOp::HypotenuseForAdjacent, &["angle", "adjacent"]),
    ("ho", TurtleOp::HypotenuseForOpposite, &["angle", "opposite"]),
    ("hb", TurtleOp::HypotenuseForBoth, &["adjacent", "opposite"]),
    // dx and dy could be called "adjacent" and "opposite".
    ("aim", TurtleOp::Aim, &["dx", "dy"]),
    ("orbit", TurtleOp::Orbit, &["x", "y", "angle"]),
    ("ellipse", TurtleOp::Ellipse, &["rx", "ry"]),
    ("up", TurtleOp::PenUp, &[]),
    ("down", TurtleOp::PenDown, &[]),
    ("push", TurtleOp::Push, &[]),
    ("pop", TurtleOp::Pop, &[]),
    ("nl", TurtleOp::Newline, &[]),
    ("sp", TurtleOp::Space, &[]),
];

/// Declare every builtin command and build its chunk. Returns the builtin
/// lookup table.
pub fn install_builtins(engine: &mut Engine, names: &mut NameTable) -> BTreeMap<String, NameId> {
    let mut builtins = BTreeMap::new();

    for &(name, op, params) in BUILTIN_COMMANDS {
        debug_assert_eq!(params.len(), op.arity());

        let mut def = NameDef::function();

        // Builtins live above the global context, at depth 0.
        def.setup_decl(name, tpath_core::Location::NONE, 0);

        let id = names.alloc(def);

        let chunk = engine.push_builtin_fn_chunk(params.len() as i32);
        engine.compile_turtle_command(op);
        engine.pop_builtin_fn_chunk();

        if let Some(data) = names.get_mut(id).callable_mut() {
            data.chunk = chunk;
            data.param_names = params.iter().map(|p| p.to_string()).collect();

            for _ in params {
                data.signature.add_value_param();
            }
        }

        builtins.insert(name.to_string(), id);
    }

    builtins
}
