use egui::{Color32, Pos2, Sense, Stroke, Vec2};

/// Unit cube corners, indexed so that bit 0/1/2 selects +x/+y/+z.
const CORNERS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

pub const EDGES: [(usize, usize); 12] = [
    (0, 1), (2, 3), (4, 5), (6, 7), // x
    (0, 2), (1, 3), (4, 6), (5, 7), // y
    (0, 4), (1, 5), (2, 6), (3, 7), // z
];

type Matrix = [[f64; 3]; 3];

fn mul(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Device-orientation rotation: intrinsic Z (alpha), X' (beta), Y'' (gamma), degrees.
pub fn rotation_matrix(alpha: f64, beta: f64, gamma: f64) -> Matrix {
    let (sa, ca) = alpha.to_radians().sin_cos();
    let (sb, cb) = beta.to_radians().sin_cos();
    let (sg, cg) = gamma.to_radians().sin_cos();

    let rz = [[ca, -sa, 0.0], [sa, ca, 0.0], [0.0, 0.0, 1.0]];
    let rx = [[1.0, 0.0, 0.0], [0.0, cb, -sb], [0.0, sb, cb]];
    let ry = [[cg, 0.0, sg], [0.0, 1.0, 0.0], [-sg, 0.0, cg]];
    mul(&mul(&rz, &rx), &ry)
}

fn rotate(m: &Matrix, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Orthographic projection of the rotated cube onto the screen plane,
/// screen y pointing down. Non-finite angles yield `None`.
pub fn project_cube(alpha: f64, beta: f64, gamma: f64) -> Option<[[f64; 2]; 8]> {
    if !(alpha.is_finite() && beta.is_finite() && gamma.is_finite()) {
        return None;
    }
    let m = rotation_matrix(alpha, beta, gamma);
    let mut projected = [[0.0; 2]; 8];
    for (out, corner) in projected.iter_mut().zip(CORNERS.iter()) {
        let [x, y, _] = rotate(&m, corner);
        *out = [x, -y];
    }
    Some(projected)
}

/// 绘制方向立方体
pub fn paint_cube(ui: &mut egui::Ui, angles: Option<(f64, f64, f64)>, size: f32, color: Color32) {
    let (response, painter) = ui.allocate_painter(Vec2::splat(size), Sense::hover());
    let rect = response.rect;
    painter.rect_stroke(rect, 4.0, Stroke::new(1.0, Color32::LIGHT_GRAY), egui::StrokeKind::Inside);

    let Some((alpha, beta, gamma)) = angles else {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "no data",
            egui::FontId::proportional(12.0),
            Color32::GRAY,
        );
        return;
    };
    let Some(points) = project_cube(alpha, beta, gamma) else {
        return;
    };

    // 对角线长度 2√3，留出边距
    let scale = size as f64 / (2.0 * 3f64.sqrt()) * 0.9;
    let center = rect.center();
    let to_screen = |p: [f64; 2]| Pos2::new(center.x + (p[0] * scale) as f32, center.y + (p[1] * scale) as f32);

    let stroke = Stroke::new(2.0, color);
    for &(a, b) in EDGES.iter() {
        painter.line_segment([to_screen(points[a]), to_screen(points[b])], stroke);
    }
}
