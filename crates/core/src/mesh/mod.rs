//! Unstructured mesh geometry and node/element topology
//!
//! Only what the interpolation engine needs from a mesh: node coordinates,
//! element connectivity, the node to element table and per-node
//! characteristic length. Reading and writing mesh files is left to the
//! caller.

mod element_table;

pub use element_table::ElementTable;

use crate::Point;
use crate::crs::{CRS, DistanceMetric};
use crate::error::{Error, Result};
use crate::raster::Extent;
use crate::spatial::{KdTree, SamplePoint};
use geo_types::coord;
use std::sync::OnceLock;
use tracing::debug;

/// A mesh vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    /// Bathymetry / topography
    pub z: f64,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z }
    }

    pub fn point(&self) -> Point {
        coord! { x: self.x, y: self.y }
    }
}

/// A triangle or quadrilateral, by node index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: usize,
    nodes: Vec<usize>,
}

impl Element {
    /// Create an element from 3 or 4 node indices
    pub fn new(id: usize, nodes: Vec<usize>) -> Result<Self> {
        if !(3..=4).contains(&nodes.len()) {
            return Err(Error::invalid_parameter(
                "element",
                id,
                format!("elements have 3 or 4 nodes, got {}", nodes.len()),
            ));
        }
        Ok(Self { id, nodes })
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Number of vertices
    pub fn n(&self) -> usize {
        self.nodes.len()
    }

    /// Edges as node index pairs, walking the vertex cycle
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.nodes.len();
        (0..n).map(move |i| (self.nodes[i], self.nodes[(i + 1) % n]))
    }
}

/// What the interpolation engine consumes from a mesh collaborator
pub trait MeshTopology {
    fn node_count(&self) -> usize;

    fn node_coordinate(&self, node: usize) -> Result<Point>;

    /// Elements incident to a node, ascending
    fn incident_elements(&self, node: usize) -> Result<&[usize]>;

    /// Characteristic length of the mesh around a node
    fn local_edge_length(&self, node: usize) -> Result<f64>;

    /// Coordinate system of the node coordinates, if declared
    fn crs(&self) -> Option<&CRS> {
        None
    }
}

/// Nodes and elements of an unstructured mesh
#[derive(Debug, Default)]
pub struct Mesh {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    crs: Option<CRS>,
    element_table: OnceLock<ElementTable>,
    nodal_tree: OnceLock<KdTree>,
}

impl Mesh {
    /// Create a mesh, checking every element references an existing node
    pub fn new(nodes: Vec<Node>, elements: Vec<Element>, crs: Option<CRS>) -> Result<Self> {
        for element in &elements {
            if let Some(&n) = element.nodes().iter().find(|&&n| n >= nodes.len()) {
                return Err(Error::NodeOutOfRange {
                    node: n,
                    nodes: nodes.len(),
                });
            }
        }
        Ok(Self {
            nodes,
            elements,
            crs,
            element_table: OnceLock::new(),
            nodal_tree: OnceLock::new(),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn node(&self, index: usize) -> Result<&Node> {
        self.nodes.get(index).ok_or(Error::NodeOutOfRange {
            node: index,
            nodes: self.nodes.len(),
        })
    }

    pub fn element(&self, index: usize) -> Result<&Element> {
        self.elements.get(index).ok_or(Error::ElementOutOfRange {
            element: index,
            elements: self.elements.len(),
        })
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    fn metric(&self) -> DistanceMetric {
        self.crs.as_ref().map(CRS::metric).unwrap_or_default()
    }

    // Edits

    /// Append a node; returns its index
    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodal_tree = OnceLock::new();
        self.element_table = OnceLock::new();
        self.nodes.len() - 1
    }

    /// Move a node; connectivity is unchanged
    pub fn move_node(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        let nodes = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(Error::NodeOutOfRange { node: index, nodes })?;
        node.x = x;
        node.y = y;
        self.nodal_tree = OnceLock::new();
        Ok(())
    }

    fn check_nodes(&self, element: &Element) -> Result<()> {
        match element.nodes().iter().find(|&&n| n >= self.nodes.len()) {
            Some(&n) => Err(Error::NodeOutOfRange {
                node: n,
                nodes: self.nodes.len(),
            }),
            None => Ok(()),
        }
    }

    /// Append an element; returns its index
    pub fn add_element(&mut self, element: Element) -> Result<usize> {
        self.check_nodes(&element)?;
        self.elements.push(element);
        self.element_table = OnceLock::new();
        Ok(self.elements.len() - 1)
    }

    /// Replace the element at `index`
    pub fn set_element(&mut self, index: usize, element: Element) -> Result<()> {
        self.check_nodes(&element)?;
        let elements = self.elements.len();
        let slot = self.elements.get_mut(index).ok_or(Error::ElementOutOfRange {
            element: index,
            elements,
        })?;
        *slot = element;
        self.element_table = OnceLock::new();
        Ok(())
    }

    /// Remove the element at `index`; later elements shift down by one
    pub fn remove_element(&mut self, index: usize) -> Result<Element> {
        if index >= self.elements.len() {
            return Err(Error::ElementOutOfRange {
                element: index,
                elements: self.elements.len(),
            });
        }
        self.element_table = OnceLock::new();
        Ok(self.elements.remove(index))
    }

    // Topology

    /// Rebuild the node to element table from the current connectivity
    pub fn build_element_table(&mut self) -> Result<()> {
        let table = self.new_element_table()?;
        self.element_table = OnceLock::from(table);
        Ok(())
    }

    /// Node to element table, built on first use after a connectivity edit
    pub fn element_table(&self) -> Result<&ElementTable> {
        match self.element_table.get() {
            Some(table) => Ok(table),
            None => {
                let table = self.new_element_table()?;
                Ok(self.element_table.get_or_init(|| table))
            }
        }
    }

    /// Whether the element table matches the current connectivity
    pub fn has_element_table(&self) -> bool {
        self.element_table.get().is_some()
    }

    fn new_element_table(&self) -> Result<ElementTable> {
        let table = ElementTable::build(self.nodes.len(), &self.elements)?;
        debug!(
            nodes = self.nodes.len(),
            elements = self.elements.len(),
            "element table built"
        );
        Ok(table)
    }

    /// Index of the node closest to `(x, y)`
    ///
    /// The search tree is built on first use and dropped by node edits.
    pub fn find_nearest_node(&self, x: f64, y: f64) -> Result<usize> {
        let tree = match self.nodal_tree.get() {
            Some(tree) => tree,
            None => {
                let points = self
                    .nodes
                    .iter()
                    .map(|n| SamplePoint::new(n.x, n.y, n.z))
                    .collect();
                let tree = KdTree::build(points)?;
                self.nodal_tree.get_or_init(|| tree)
            }
        };
        Ok(tree.nearest(x, y).index)
    }

    /// Bounding box of the nodes
    pub fn extent(&self) -> Extent {
        Extent::enclosing(self.nodes.iter().map(|n| (n.x, n.y)))
    }

    /// Local edge length of every node
    pub fn compute_mesh_size(&self) -> Result<Vec<f64>> {
        (0..self.nodes.len())
            .map(|i| self.local_edge_length(i))
            .collect()
    }
}

impl MeshTopology for Mesh {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_coordinate(&self, node: usize) -> Result<Point> {
        self.node(node).map(Node::point)
    }

    fn incident_elements(&self, node: usize) -> Result<&[usize]> {
        self.element_table()?.element_list(node)
    }

    /// Mean length of the distinct edges that touch the node; zero for a
    /// node without elements.
    fn local_edge_length(&self, node: usize) -> Result<f64> {
        let origin = self.node(node)?.point();
        let metric = self.metric();

        let mut neighbours: Vec<usize> = Vec::with_capacity(8);
        for &e in self.element_table()?.element_list(node)? {
            for (a, b) in self.elements[e].edges() {
                if a == node {
                    neighbours.push(b);
                } else if b == node {
                    neighbours.push(a);
                }
            }
        }
        neighbours.sort_unstable();
        neighbours.dedup();

        if neighbours.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = neighbours
            .iter()
            .map(|&n| metric.distance(origin, self.nodes[n].point()))
            .sum();
        Ok(total / neighbours.len() as f64)
    }

    fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }
}
