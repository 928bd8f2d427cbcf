//! Node to incident-element adjacency
//!
//! Stored in compressed-row form: the elements around node `i` are
//! `elements[offsets[i]..offsets[i + 1]]`, in ascending element order.

use super::Element;
use crate::error::{Error, Result};

/// Elements incident to each node of a mesh.
///
/// The table holds element indices, never references into the mesh, and is
/// rebuilt from scratch whenever connectivity changes. A default table is
/// uninitialized and answers every query with `TopologyNotBuilt`.
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    offsets: Vec<usize>,
    elements: Vec<usize>,
    initialized: bool,
}

impl ElementTable {
    /// Build the table for `num_nodes` nodes.
    ///
    /// One counting pass and one fill pass over every element vertex.
    pub fn build(num_nodes: usize, elements: &[Element]) -> Result<Self> {
        let mut offsets = vec![0usize; num_nodes + 1];
        for element in elements {
            for &n in element.nodes() {
                if n >= num_nodes {
                    return Err(Error::NodeOutOfRange {
                        node: n,
                        nodes: num_nodes,
                    });
                }
                offsets[n + 1] += 1;
            }
        }
        for i in 0..num_nodes {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut table = vec![0usize; offsets[num_nodes]];
        for (e, element) in elements.iter().enumerate() {
            for &n in element.nodes() {
                table[cursor[n]] = e;
                cursor[n] += 1;
            }
        }

        Ok(Self {
            offsets,
            elements: table,
            initialized: true,
        })
    }

    /// Whether the table has been built
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Number of nodes the table was built for
    pub fn num_nodes(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn range(&self, node: usize) -> Result<(usize, usize)> {
        if !self.initialized {
            return Err(Error::TopologyNotBuilt);
        }
        if node >= self.num_nodes() {
            return Err(Error::NodeOutOfRange {
                node,
                nodes: self.num_nodes(),
            });
        }
        Ok((self.offsets[node], self.offsets[node + 1]))
    }

    /// Elements around a node
    pub fn element_list(&self, node: usize) -> Result<&[usize]> {
        let (start, end) = self.range(node)?;
        Ok(&self.elements[start..end])
    }

    pub fn num_elements_around_node(&self, node: usize) -> Result<usize> {
        let (start, end) = self.range(node)?;
        Ok(end - start)
    }

    /// Element at `position` in a node's list
    pub fn element_at(&self, node: usize, position: usize) -> Result<usize> {
        let list = self.element_list(node)?;
        list.get(position).copied().ok_or(Error::ListIndex {
            node,
            position,
            len: list.len(),
        })
    }
}
