#![forbid(unsafe_code)]

//! Wireframe polyhedra for the decorative floating solids.
//!
//! Faces are subdivided the same way three.js `PolyhedronGeometry` does:
//! `detail` extra cuts per edge, vertices pushed onto the sphere. Only the
//! unique vertices and edges are kept since the solids are drawn as lines.

use std::collections::{BTreeSet, HashMap};

/// Line geometry: unique vertices plus index pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WireframeMesh {
    pub vertices: Vec<[f32; 3]>,
    pub edges: Vec<[u32; 2]>,
}

impl WireframeMesh {
    /// Edge endpoints flattened into a line list.
    pub fn line_list(&self) -> Vec<[f32; 3]> {
        self.edges
            .iter()
            .flat_map(|[a, b]| [self.vertices[*a as usize], self.vertices[*b as usize]])
            .collect()
    }
}

const OCTAHEDRON_VERTICES: [[f64; 3]; 6] = [
    [1.0, 0.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

const OCTAHEDRON_FACES: [[usize; 3]; 8] = [
    [0, 2, 4],
    [0, 4, 3],
    [0, 3, 5],
    [0, 5, 2],
    [1, 2, 5],
    [1, 5, 3],
    [1, 3, 4],
    [1, 4, 2],
];

const PHI: f64 = 1.618_033_988_749_895;

const ICOSAHEDRON_VERTICES: [[f64; 3]; 12] = [
    [-1.0, PHI, 0.0],
    [1.0, PHI, 0.0],
    [-1.0, -PHI, 0.0],
    [1.0, -PHI, 0.0],
    [0.0, -1.0, PHI],
    [0.0, 1.0, PHI],
    [0.0, -1.0, -PHI],
    [0.0, 1.0, -PHI],
    [PHI, 0.0, -1.0],
    [PHI, 0.0, 1.0],
    [-PHI, 0.0, -1.0],
    [-PHI, 0.0, 1.0],
];

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Regular octahedron of the given circumradius.
pub fn octahedron(radius: f64, detail: u32) -> WireframeMesh {
    polyhedron(&OCTAHEDRON_VERTICES, &OCTAHEDRON_FACES, radius, detail)
}

/// Icosahedron (geodesic sphere when `detail > 0`) of the given radius.
pub fn icosahedron(radius: f64, detail: u32) -> WireframeMesh {
    polyhedron(&ICOSAHEDRON_VERTICES, &ICOSAHEDRON_FACES, radius, detail)
}

fn polyhedron(base: &[[f64; 3]], faces: &[[usize; 3]], radius: f64, detail: u32) -> WireframeMesh {
    let mut builder = Builder::new(radius);
    let cols = detail as usize + 1;
    for face in faces {
        let [a, b, c] = face.map(|i| base[i]);
        // grid[i][j]: row i runs from lerp(a, c) to lerp(b, c).
        let mut grid: Vec<Vec<u32>> = Vec::with_capacity(cols + 1);
        for i in 0..=cols {
            let t = i as f64 / cols as f64;
            let aj = lerp3(a, c, t);
            let bj = lerp3(b, c, t);
            let rows = cols - i;
            let row = (0..=rows)
                .map(|j| {
                    let p = if rows == 0 {
                        aj
                    } else {
                        lerp3(aj, bj, j as f64 / rows as f64)
                    };
                    builder.vertex(p)
                })
                .collect();
            grid.push(row);
        }
        for i in 0..cols {
            for j in 0..(2 * (cols - i) - 1) {
                let k = j / 2;
                let tri = if j % 2 == 0 {
                    [grid[i][k + 1], grid[i + 1][k], grid[i][k]]
                } else {
                    [grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]
                };
                builder.triangle(tri);
            }
        }
    }
    builder.finish()
}

struct Builder {
    radius: f64,
    vertices: Vec<[f32; 3]>,
    lookup: HashMap<[i64; 3], u32>,
    edges: BTreeSet<[u32; 2]>,
}

impl Builder {
    fn new(radius: f64) -> Self {
        Self {
            radius,
            vertices: Vec::new(),
            lookup: HashMap::new(),
            edges: BTreeSet::new(),
        }
    }

    fn vertex(&mut self, p: [f64; 3]) -> u32 {
        let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        let unit = if len > 0.0 { p.map(|v| v / len) } else { p };
        let key = unit.map(|v| (v * 1.0e6).round() as i64);
        if let Some(&idx) = self.lookup.get(&key) {
            return idx;
        }
        let idx = self.vertices.len() as u32;
        self.vertices.push(unit.map(|v| (v * self.radius) as f32));
        self.lookup.insert(key, idx);
        idx
    }

    fn triangle(&mut self, [a, b, c]: [u32; 3]) {
        for (x, y) in [(a, b), (b, c), (c, a)] {
            if x != y {
                self.edges.insert([x.min(y), x.max(y)]);
            }
        }
    }

    fn finish(self) -> WireframeMesh {
        WireframeMesh {
            vertices: self.vertices,
            edges: self.edges.into_iter().collect(),
        }
    }
}

fn lerp3(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}
