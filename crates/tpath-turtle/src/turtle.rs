//! The turtle state machine.
//!
//! [`PathTurtle`] tracks a position, a heading in degrees, a pen height, and
//! the SVG path state (deferred moves, the reflected control point that the
//! `t` command continues from). Drawing commands convert through the current
//! transform and the matrix stack, then emit path data through the writer.
//!
//! Movement is deferred: `m`, `M`, and pen-up drawing only mark the path as
//! moved, and the next real draw emits a single absolute `M` first.

use crate::error::TurtleError;
use crate::math::{
    adjust_angle, angle_kind, approx_eq, atan_d, cos_d, normalized, sin_d, tan_d, AngleKind,
};
use crate::matrix::Matrix2d;
use crate::writer::PathWriter;

type TurtleResult = Result<(), TurtleError>;

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub(crate) struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    fn offset(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    fn set(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }
}

/// Models the SVG path state so the turtle can match it.
#[derive(Clone, Debug)]
struct PathState {
    has_moved: bool,

    /// Reflected control point for `t`, carried from the previous `q`, `Q`,
    /// or `t` command.
    next_q_control: Option<Point>,
}

impl Default for PathState {
    fn default() -> Self {
        Self {
            has_moved: true,
            next_q_control: None,
        }
    }
}

impl PathState {
    /// Consume the moved flag; true means a deferred `M` must be emitted.
    fn clear_has_moved(&mut self) -> bool {
        if !self.has_moved {
            return false;
        }

        self.has_moved = false;
        self.next_q_control = None;
        true
    }

    fn set_has_moved(&mut self) {
        self.has_moved = true;
        self.next_q_control = None;
    }

    fn set_next_q_control(&mut self, pt: Point) {
        self.next_q_control = Some(pt);
    }
}

#[derive(Clone, Debug, Default)]
struct TurtleState {
    point: Point,
    dir: f64,
    pen_height: i32,
    path: PathState,
    saved_point_valid: bool,
}

/// A copy of the externally visible turtle state, for trace output.
#[derive(Copy, Clone, Debug)]
pub struct TurtleSnapshot {
    pub x: f64,
    pub y: f64,
    pub dir: f64,
    pub initial_x: f64,
    pub initial_y: f64,
}

/// The turtle.
pub struct PathTurtle {
    initial_pt: Point,
    state: TurtleState,

    xform: Matrix2d,
    reflected: bool,

    turtle_stack: Vec<TurtleState>,
    matrix_stack: Vec<(Matrix2d, bool)>,

    writer: PathWriter,
}

impl PathTurtle {
    pub fn new(writer: PathWriter) -> Self {
        Self {
            initial_pt: Point::default(),
            state: TurtleState::default(),
            xform: Matrix2d::IDENTITY,
            reflected: false,
            turtle_stack: Vec::new(),
            matrix_stack: Vec::new(),
            writer,
        }
    }

    // -- Inspectors ---------------------------------------

    pub fn x(&self) -> f64 {
        self.state.point.x
    }

    pub fn y(&self) -> f64 {
        self.state.point.y
    }

    pub fn dir(&self) -> f64 {
        self.state.dir
    }

    pub fn pen_height(&self) -> i32 {
        self.state.pen_height
    }

    pub fn pen_is_on_paper(&self) -> bool {
        self.state.pen_height == 0
    }

    pub fn snapshot(&self) -> TurtleSnapshot {
        TurtleSnapshot {
            x: self.state.point.x,
            y: self.state.point.y,
            dir: self.state.dir,
            initial_x: self.initial_pt.x,
            initial_y: self.initial_pt.y,
        }
    }

    pub fn writer_mut(&mut self) -> &mut PathWriter {
        &mut self.writer
    }

    /// Terminate the output stream.
    pub fn finish(&mut self) -> TurtleResult {
        self.writer.finish()?;
        Ok(())
    }

    // -- Coordinate conversion ----------------------------

    fn convert_point(&self, mut pt: Point, z: f64) -> Point {
        self.xform.apply(&mut pt.x, &mut pt.y, z);

        // Matrix stack applies top (most recent) first.
        for (m, _) in self.matrix_stack.iter().rev() {
            m.apply(&mut pt.x, &mut pt.y, z);
        }

        pt
    }

    /// Scale a length into world space; translation is disabled and any
    /// rotation is removed again with the pythagorean theorem.
    fn convert_length(&self, len: f64) -> f64 {
        let pt = self.convert_point(Point { x: len, y: 0.0 }, 0.0);

        (pt.x * pt.x + pt.y * pt.y).sqrt()
    }

    /// Convert an angle by transforming a probe segment.
    fn convert_angle(&self, angle: f64) -> f64 {
        let p1 = self.state.point;
        let p2 = Point {
            x: p1.x + 200.0 * cos_d(angle),
            y: p1.y + 200.0 * sin_d(angle),
        };

        let p1 = self.convert_point(p1, 1.0);
        let p2 = self.convert_point(p2, 1.0);

        atan_d((p2.y - p1.y) / (p2.x - p1.x))
    }

    fn is_reflection_viewport(&self) -> bool {
        self.reflected
    }

    // -- Emitting -----------------------------------------

    fn emit_point(&mut self, pt: Point) -> TurtleResult {
        let pt = self.convert_point(pt, 1.0);

        self.writer.emit_number(pt.x)?;
        self.writer.emit_number(pt.y)?;
        Ok(())
    }

    fn emit_length(&mut self, len: f64) -> TurtleResult {
        let len = self.convert_length(len);

        self.writer.emit_number(len)?;
        Ok(())
    }

    /// Prepare to draw from `current`. Emits the deferred `M` when the path
    /// has moved; returns false when the pen is up (the command becomes a
    /// movement).
    fn prepare_draw(&mut self, current: Point) -> Result<bool, TurtleError> {
        if self.pen_is_on_paper() {
            if self.state.path.clear_has_moved() {
                self.writer.emit_char('M')?;
                self.emit_point(current)?;

                self.initial_pt = current;
            }

            // Drawing invalidates every point saved on the stack.
            for st in &mut self.turtle_stack {
                st.saved_point_valid = false;
            }

            return Ok(true);
        }

        self.state.path.set_has_moved();
        Ok(false)
    }

    fn reflect_q_control(&mut self, mut control: Point) {
        control.x += 2.0 * (self.state.point.x - control.x);
        control.y += 2.0 * (self.state.point.y - control.y);

        self.state.path.set_next_q_control(control);
    }

    // -- Matrix commands ----------------------------------

    pub fn rotation(&mut self, angle: f64) {
        self.xform.rotate(angle);
    }

    pub fn scaling(&mut self, x: f64, y: f64) {
        self.xform.scale(x, y);
    }

    pub fn shearing(&mut self, x: f64, y: f64) {
        self.xform.shear(x, y);
    }

    pub fn reflection(&mut self, x: f64, y: f64) -> TurtleResult {
        if approx_eq(x, 0.0) && approx_eq(y, 0.0) {
            return Err(TurtleError::InvalidReflection);
        }

        self.xform.reflect(x, y);
        self.reflected = !self.reflected;
        Ok(())
    }

    pub fn translation(&mut self, x: f64, y: f64) {
        self.xform.translate(x, y);
    }

    pub fn push_matrix(&mut self) {
        self.matrix_stack.push((self.xform, self.reflected));
        self.xform = Matrix2d::IDENTITY;
    }

    pub fn pop_matrix(&mut self) -> TurtleResult {
        let (xform, reflected) = self
            .matrix_stack
            .pop()
            .ok_or(TurtleError::EmptyMatrixStack)?;

        self.xform = xform;
        self.reflected = reflected;
        Ok(())
    }

    // -- Heading commands ---------------------------------

    /// Absolute heading.
    pub fn set_dir(&mut self, new_angle: f64) {
        self.state.dir = normalized(new_angle);
    }

    /// Turn right (counter-clockwise in path coordinates).
    pub fn right(&mut self, angle: f64) {
        self.state.dir = normalized(self.state.dir + angle);
    }

    pub fn left(&mut self, angle: f64) {
        self.state.dir = normalized(self.state.dir - angle);
    }

    /// Point along the vector (adjacent, opposite); no-op for a zero vector.
    pub fn aim(&mut self, adjacent: f64, opposite: f64) {
        if !approx_eq(adjacent, 0.0) || !approx_eq(opposite, 0.0) {
            let mut angle = atan_d(opposite / adjacent);

            if adjacent < 0.0 {
                angle += 180.0;
            }

            self.set_dir(angle);
        }
    }

    // -- Movement and drawing -----------------------------

    /// Relative move, no output.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.state.point.offset(dx, dy);
        self.state.path.set_has_moved();
    }

    /// Absolute move, no output.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.state.point.set(x, y);
        self.state.path.set_has_moved();
    }

    /// Forward, drawing a line.
    pub fn forward(&mut self, distance: f64) -> TurtleResult {
        let current = self.state.point;

        self.state.point.offset(
            distance * cos_d(self.state.dir),
            distance * sin_d(self.state.dir),
        );

        if self.prepare_draw(current)? {
            self.writer.emit_char('L')?;
            self.emit_point(self.state.point)?;
        }
        Ok(())
    }

    /// Forward without drawing.
    pub fn jump(&mut self, distance: f64) {
        self.state.point.offset(
            distance * cos_d(self.state.dir),
            distance * sin_d(self.state.dir),
        );
        self.state.path.set_has_moved();
    }

    /// Circular arc of the given radius, sweeping `angle` degrees (sign
    /// picks the direction).
    pub fn arc(&mut self, radius: f64, mut angle: f64) -> TurtleResult {
        let current = self.state.point;

        let mut sweep = angle >= 0.0;
        let walk_rotation = if sweep { 90.0 } else { -90.0 };

        if self.is_reflection_viewport() {
            sweep = !sweep;
        }

        while angle > 360.0 {
            angle -= 360.0;
        }
        while angle < -360.0 {
            angle += 360.0;
        }

        if approx_eq(angle, 0.0) {
            return Ok(());
        }

        let large_arc = angle.abs() >= 180.0;

        // Walk to the end point with no-output commands.
        {
            let saved_path = self.state.path.clone();
            self.pen_up();

            self.right(walk_rotation);
            self.jump(radius);
            self.right(angle - 180.0);
            self.jump(radius);
            self.right(walk_rotation);

            self.pen_down();
            self.state.path = saved_path;
        }

        if self.prepare_draw(current)? {
            self.writer.emit_char('A')?;
            self.emit_length(radius)?;
            self.emit_length(radius)?;
            self.writer.emit_number(0.0)?;
            self.writer.emit_flag(large_arc)?;
            self.writer.emit_flag(sweep)?;
            self.emit_point(self.state.point)?;
        }
        Ok(())
    }

    /// Quadratic curve to a relative end point, arriving at `angle`. The
    /// control point is the intersection of the departure and arrival lines.
    pub fn quad_by(&mut self, dx: f64, dy: f64, angle: f64) -> TurtleResult {
        let current = self.state.point;

        let angle = normalized(angle);

        let x = self.state.point.x;
        let y = self.state.point.y;

        let m1 = tan_d(self.state.dir);
        let m2 = tan_d(angle);

        let t1 = angle_kind(self.state.dir);
        let t2 = angle_kind(angle);

        let mut control = Point::default();

        if t1 == AngleKind::Vertical || t2 == AngleKind::Vertical {
            if t1 == t2 {
                return Err(TurtleError::ParallelLines);
            }

            if t1 == AngleKind::Vertical {
                control.x = x;
                control.y = m2 * -dx + y + dy;
            } else {
                control.x = x + dx;
                control.y = m1 * dx + y;
            }
        } else if approx_eq(m1, m2) {
            return Err(TurtleError::ParallelLines);
        } else {
            control.x = ((m1 * x - m2 * (x + dx)) + dy) / (m1 - m2);
            control.y = m1 * (control.x - x) + y;
        }

        self.state.point.offset(dx, dy);
        self.state.dir = angle;

        if self.prepare_draw(current)? {
            self.writer.emit_char('Q')?;
            self.emit_point(control)?;
            self.emit_point(self.state.point)?;
        }

        self.reflect_q_control(control);
        Ok(())
    }

    /// Quadratic curve to an absolute end point.
    pub fn quad_to(&mut self, x: f64, y: f64, angle: f64) -> TurtleResult {
        self.quad_by(x - self.state.point.x, y - self.state.point.y, angle)
    }

    /// Smooth quadratic continuation over `distance`.
    pub fn smooth_quad(&mut self, distance: f64) -> TurtleResult {
        let current = self.state.point;

        {
            let saved_path = self.state.path.clone();
            self.pen_up();

            self.jump(distance);

            self.pen_down();
            self.state.path = saved_path;
        }

        let control = self.state.path.next_q_control;

        if let Some(ctrl) = control {
            let dx = self.state.point.x - ctrl.x;
            let dy = self.state.point.y - ctrl.y;

            adjust_angle(&mut self.state.dir, dx, dy);
        }

        if self.prepare_draw(current)? {
            self.writer.emit_char('T')?;
            self.emit_point(self.state.point)?;
        }

        if let Some(ctrl) = control {
            self.reflect_q_control(ctrl);
        }
        Ok(())
    }

    /// Cubic curve: departure control (len1 at angle1 from the start),
    /// arrival control (len2 at angle2 into the end), relative end point.
    pub fn curve_by(
        &mut self,
        l1: f64,
        a1: f64,
        l2: f64,
        a2: f64,
        dx: f64,
        dy: f64,
    ) -> TurtleResult {
        if self.pen_is_on_paper() {
            let current = self.state.point;

            let a1 = normalized(a1);
            let a2 = normalized(a2);

            let x = self.state.point.x;
            let y = self.state.point.y;

            let start_control = Point {
                x: x + l1 * cos_d(a1),
                y: y + l1 * sin_d(a1),
            };

            let end_control = Point {
                x: x + dx - l2 * cos_d(a2),
                y: y + dy - l2 * sin_d(a2),
            };

            self.state.point.offset(dx, dy);
            self.state.dir = a2;

            if self.prepare_draw(current)? {
                self.writer.emit_char('C')?;
                self.emit_point(start_control)?;
                self.emit_point(end_control)?;
                self.emit_point(self.state.point)?;
            }
        } else {
            self.state.point.offset(dx, dy);
            self.state.dir = normalized(a2);
        }
        Ok(())
    }

    pub fn curve_to(&mut self, l1: f64, a1: f64, l2: f64, a2: f64, x: f64, y: f64) -> TurtleResult {
        self.curve_by(
            l1,
            a1,
            l2,
            a2,
            x - self.state.point.x,
            y - self.state.point.y,
        )
    }

    /// Smooth cubic: arrival control only.
    pub fn smooth_by(&mut self, l2: f64, a2: f64, dx: f64, dy: f64) -> TurtleResult {
        if self.pen_is_on_paper() {
            let current = self.state.point;

            let a2 = normalized(a2);

            let x = self.state.point.x;
            let y = self.state.point.y;

            let end_control = Point {
                x: x + dx - l2 * cos_d(a2),
                y: y + dy - l2 * sin_d(a2),
            };

            self.state.point.offset(dx, dy);
            self.state.dir = a2;

            if self.prepare_draw(current)? {
                self.writer.emit_char('S')?;
                self.emit_point(end_control)?;
                self.emit_point(self.state.point)?;
            }
        } else {
            self.state.point.offset(dx, dy);
            self.state.dir = normalized(a2);
        }
        Ok(())
    }

    pub fn smooth_to(&mut self, l2: f64, a2: f64, x: f64, y: f64) -> TurtleResult {
        self.smooth_by(l2, a2, x - self.state.point.x, y - self.state.point.y)
    }

    /// Close the path: return to the subpath start, aiming along the travel.
    pub fn close(&mut self) -> TurtleResult {
        let dx = self.initial_pt.x - self.state.point.x;
        let dy = self.initial_pt.y - self.state.point.y;

        let current = self.state.point;

        self.state.point = self.initial_pt;

        adjust_angle(&mut self.state.dir, dx, dy);

        if self.prepare_draw(current)? {
            // Z is the one command with no destination point.
            self.writer.emit_char('Z')?;
        }
        Ok(())
    }

    // -- Right-triangle commands --------------------------

    pub fn adjacent_for_hypotenuse(&mut self, angle: f64, hypotenuse: f64) -> TurtleResult {
        self.forward(hypotenuse * cos_d(angle))
    }

    pub fn adjacent_for_opposite(&mut self, angle: f64, opposite: f64) -> TurtleResult {
        self.forward(opposite / tan_d(angle))
    }

    pub fn hypotenuse_for_adjacent(&mut self, angle: f64, adjacent: f64) -> TurtleResult {
        self.forward(adjacent / cos_d(angle))
    }

    pub fn hypotenuse_for_opposite(&mut self, angle: f64, opposite: f64) -> TurtleResult {
        self.forward(opposite / sin_d(angle))
    }

    pub fn hypotenuse_for_both(&mut self, adjacent: f64, opposite: f64) -> TurtleResult {
        let distance = (adjacent * adjacent + opposite * opposite).sqrt();

        if distance != 0.0 {
            self.forward(distance)?;
        }
        Ok(())
    }

    // -- Compound commands --------------------------------

    /// Arc around the center (cx, cy), sweeping `angle` degrees; no-op when
    /// the turtle is already at the center.
    pub fn orbit(&mut self, cx: f64, cy: f64, angle: f64) -> TurtleResult {
        let dx = self.state.point.x - cx;
        let dy = self.state.point.y - cy;

        if adjust_angle(&mut self.state.dir, dx, dy) {
            self.right(if angle < 0.0 { -90.0 } else { 90.0 });

            let radius = (dx * dx + dy * dy).sqrt();

            self.arc(radius, angle)?;
        }
        Ok(())
    }

    /// A whole ellipse centered on the turtle, as two `A` halves. The turtle
    /// state is preserved.
    pub fn ellipse(&mut self, rx: f64, ry: f64) -> TurtleResult {
        let angle = self.state.dir;

        let dx = rx * cos_d(angle);
        let dy = rx * sin_d(angle);

        self.push();

        self.move_by(dx, dy);
        self.right(90.0);

        let angle = self.convert_angle(angle);

        let current = self.state.point;
        self.state.point.offset(-dx * 2.0, -dy * 2.0);

        if self.prepare_draw(current)? {
            self.writer.emit_char('A')?;
            self.emit_length(rx)?;
            self.emit_length(ry)?;
            self.writer.emit_number(angle)?;
            self.writer.emit_number(0.0)?;
            self.writer.emit_number(1.0)?;
            self.emit_point(self.state.point)?;
        }

        let current = self.state.point;
        self.state.point.offset(dx * 2.0, dy * 2.0);

        if self.prepare_draw(current)? {
            self.writer.emit_char('A')?;
            self.emit_length(rx)?;
            self.emit_length(ry)?;
            self.writer.emit_number(angle)?;
            self.writer.emit_number(0.0)?;
            self.writer.emit_number(1.0)?;
            self.emit_point(self.state.point)?;
        }

        self.pop()
    }

    // -- Formatting commands ------------------------------

    pub fn newline(&mut self) -> TurtleResult {
        self.writer.emit_char('\n')?;
        Ok(())
    }

    pub fn space(&mut self) -> TurtleResult {
        self.writer.emit_char(' ')?;
        Ok(())
    }

    // -- State commands -----------------------------------

    pub fn pen_up(&mut self) {
        self.state.pen_height += 1;
    }

    pub fn pen_down(&mut self) {
        self.state.pen_height -= 1;
    }

    pub fn push(&mut self) {
        self.state.saved_point_valid = true;
        self.turtle_stack.push(self.state.clone());
    }

    pub fn pop(&mut self) -> TurtleResult {
        self.state = self
            .turtle_stack
            .pop()
            .ok_or(TurtleError::EmptyTurtleStack)?;

        // A draw happened since the save; the restored position needs a
        // fresh move.
        if !self.state.saved_point_valid {
            self.state.path.set_has_moved();
        }
        Ok(())
    }
}
