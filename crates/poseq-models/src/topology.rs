//! Skeleton topology: ordered keypoint names and a parent→child limb tree.
//!
//! The topology is fixed for a whole run and shared by every frame. Frames
//! store keypoints in topology order, so a keypoint is addressed by its index
//! here rather than by a free-form name lookup.
//!
//! Construction validates the tree: every name unique, every limb endpoint
//! known, at most one parent per keypoint and no cycles. Limbs are stored in
//! topological (parent-before-child) order so constraint passes can walk
//! them front to back.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Result type for topology construction.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors raised while building a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Topology has no keypoints")]
    Empty,

    #[error("Duplicate keypoint name: {0}")]
    DuplicateName(String),

    #[error("Limb references unknown keypoint: {0}")]
    UnknownKeypoint(String),

    #[error("Limb connects keypoint {0} to itself")]
    SelfLimb(String),

    #[error("Keypoint {0} has more than one parent")]
    MultipleParents(String),

    #[error("Limb cycle through keypoint {0}")]
    Cycle(String),
}

/// A parent→child bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Limb {
    pub parent: usize,
    pub child: usize,
}

/// Keypoint indices used for body-scale normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorsoLandmarks {
    pub left_shoulder: usize,
    pub right_shoulder: usize,
    pub left_hip: usize,
    pub right_hip: usize,
}

/// Serialized form of a topology; validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopologyDef {
    pub keypoints: Vec<String>,
    /// `(parent, child)` name pairs.
    pub limbs: Vec<(String, String)>,
}

/// Validated skeleton topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TopologyDef", into = "TopologyDef")]
pub struct SkeletonTopology {
    names: Vec<String>,
    limbs: Vec<Limb>,
    parents: Vec<Option<usize>>,
    descendants: Vec<Vec<usize>>,
}

impl SkeletonTopology {
    /// Build a topology from keypoint names and `(parent, child)` name pairs.
    pub fn new<S: AsRef<str>>(names: &[S], limbs: &[(S, S)]) -> TopologyResult<Self> {
        if names.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut lookup: HashMap<&str, usize> = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if lookup.insert(name.as_ref(), i).is_some() {
                return Err(TopologyError::DuplicateName(name.as_ref().to_string()));
            }
        }

        let resolve = |name: &str| {
            lookup
                .get(name)
                .copied()
                .ok_or_else(|| TopologyError::UnknownKeypoint(name.to_string()))
        };

        let n = names.len();
        let mut parents: Vec<Option<usize>> = vec![None; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (p, c) in limbs {
            let parent = resolve(p.as_ref())?;
            let child = resolve(c.as_ref())?;
            if parent == child {
                return Err(TopologyError::SelfLimb(c.as_ref().to_string()));
            }
            if parents[child].is_some() {
                return Err(TopologyError::MultipleParents(c.as_ref().to_string()));
            }
            parents[child] = Some(parent);
            children[parent].push(child);
        }
        for list in &mut children {
            list.sort_unstable();
        }

        // Breadth-first from every root; with single parents, anything not
        // reached sits on a cycle.
        let mut visited = vec![false; n];
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| parents[i].is_none()).collect();
        let mut ordered_limbs = Vec::with_capacity(limbs.len());
        let mut bfs_order = Vec::with_capacity(n);
        while let Some(node) = queue.pop_front() {
            visited[node] = true;
            bfs_order.push(node);
            for &child in &children[node] {
                ordered_limbs.push(Limb {
                    parent: node,
                    child,
                });
                queue.push_back(child);
            }
        }
        if let Some(stuck) = visited.iter().position(|v| !v) {
            return Err(TopologyError::Cycle(names[stuck].as_ref().to_string()));
        }

        // Children appear after parents in BFS order, so walking it backwards
        // lets each node absorb its children's subtrees.
        let mut descendants: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &node in bfs_order.iter().rev() {
            let mut subtree = Vec::new();
            for &child in &children[node] {
                subtree.push(child);
                subtree.extend_from_slice(&descendants[child]);
            }
            descendants[node] = subtree;
        }

        Ok(Self {
            names: names.iter().map(|s| s.as_ref().to_string()).collect(),
            limbs: ordered_limbs,
            parents,
            descendants,
        })
    }

    /// SMPL 24-joint body model (pelvis root), as emitted by HMR2/PHALP.
    pub fn smpl24() -> Self {
        const NAMES: [&str; 24] = [
            "pelvis",
            "left_hip",
            "right_hip",
            "spine1",
            "left_knee",
            "right_knee",
            "spine2",
            "left_ankle",
            "right_ankle",
            "spine3",
            "left_foot",
            "right_foot",
            "neck",
            "left_collar",
            "right_collar",
            "head",
            "left_shoulder",
            "right_shoulder",
            "left_elbow",
            "right_elbow",
            "left_wrist",
            "right_wrist",
            "left_hand",
            "right_hand",
        ];
        const PARENTS: [i32; 24] = [
            -1, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 9, 9, 12, 13, 14, 16, 17, 18, 19, 20, 21,
        ];

        let limbs: Vec<(&str, &str)> = PARENTS
            .iter()
            .enumerate()
            .filter(|(_, &p)| p >= 0)
            .map(|(child, &p)| (NAMES[p as usize], NAMES[child]))
            .collect();

        Self::new(&NAMES, &limbs).expect("SMPL-24 topology is a valid tree")
    }

    /// COCO 17-keypoint layout, rooted at the nose.
    pub fn coco17() -> Self {
        const NAMES: [&str; 17] = [
            "nose",
            "left_eye",
            "right_eye",
            "left_ear",
            "right_ear",
            "left_shoulder",
            "right_shoulder",
            "left_elbow",
            "right_elbow",
            "left_wrist",
            "right_wrist",
            "left_hip",
            "right_hip",
            "left_knee",
            "right_knee",
            "left_ankle",
            "right_ankle",
        ];
        const LIMBS: [(&str, &str); 16] = [
            ("nose", "left_eye"),
            ("nose", "right_eye"),
            ("left_eye", "left_ear"),
            ("right_eye", "right_ear"),
            ("nose", "left_shoulder"),
            ("nose", "right_shoulder"),
            ("left_shoulder", "left_elbow"),
            ("left_elbow", "left_wrist"),
            ("right_shoulder", "right_elbow"),
            ("right_elbow", "right_wrist"),
            ("left_shoulder", "left_hip"),
            ("right_shoulder", "right_hip"),
            ("left_hip", "left_knee"),
            ("left_knee", "left_ankle"),
            ("right_hip", "right_knee"),
            ("right_knee", "right_ankle"),
        ];

        Self::new(&NAMES, &LIMBS).expect("COCO-17 topology is a valid tree")
    }

    /// Number of keypoints per frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed topology.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Keypoint names in frame order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of a keypoint index.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Index of a keypoint name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Limbs in parent-before-child order.
    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    /// Parent of a keypoint, `None` for roots.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Every keypoint below `index` in the tree (excluding `index`).
    pub fn descendants(&self, index: usize) -> &[usize] {
        self.descendants
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Human-readable `parent->child` label for a limb.
    pub fn limb_label(&self, limb: Limb) -> String {
        format!(
            "{}->{}",
            self.name(limb.parent).unwrap_or("?"),
            self.name(limb.child).unwrap_or("?")
        )
    }

    /// Shoulder and hip indices, if the topology names all four.
    pub fn torso(&self) -> Option<TorsoLandmarks> {
        Some(TorsoLandmarks {
            left_shoulder: self.index_of("left_shoulder")?,
            right_shoulder: self.index_of("right_shoulder")?,
            left_hip: self.index_of("left_hip")?,
            right_hip: self.index_of("right_hip")?,
        })
    }
}

impl TryFrom<TopologyDef> for SkeletonTopology {
    type Error = TopologyError;

    fn try_from(def: TopologyDef) -> TopologyResult<Self> {
        Self::new(&def.keypoints, &def.limbs)
    }
}

impl From<SkeletonTopology> for TopologyDef {
    fn from(topology: SkeletonTopology) -> Self {
        let limbs = topology
            .limbs
            .iter()
            .map(|l| {
                (
                    topology.names[l.parent].clone(),
                    topology.names[l.child].clone(),
                )
            })
            .collect();
        Self {
            keypoints: topology.names,
            limbs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smpl24_shape() {
        let topo = SkeletonTopology::smpl24();
        assert_eq!(topo.len(), 24);
        assert_eq!(topo.limbs().len(), 23);
        assert_eq!(topo.index_of("pelvis"), Some(0));
        assert_eq!(topo.parent(20), Some(18)); // left_wrist -> left_elbow
        assert!(topo.torso().is_some());
    }

    #[test]
    fn test_limbs_are_topologically_ordered() {
        let topo = SkeletonTopology::smpl24();
        let mut seen_child = vec![false; topo.len()];
        seen_child[0] = true;
        for limb in topo.limbs() {
            assert!(seen_child[limb.parent], "parent {} visited late", limb.parent);
            seen_child[limb.child] = true;
        }
    }

    #[test]
    fn test_descendants_of_elbow() {
        let topo = SkeletonTopology::smpl24();
        let elbow = topo.index_of("left_elbow").unwrap();
        let mut below: Vec<&str> = topo
            .descendants(elbow)
            .iter()
            .map(|&i| topo.name(i).unwrap())
            .collect();
        below.sort_unstable();
        assert_eq!(below, vec!["left_hand", "left_wrist"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let names = ["a", "b", "c"];
        let limbs = [("a", "b"), ("b", "c"), ("c", "b")];
        assert!(matches!(
            SkeletonTopology::new(&names, &limbs),
            Err(TopologyError::MultipleParents(_))
        ));

        let limbs = [("b", "c"), ("c", "b")];
        assert!(matches!(
            SkeletonTopology::new(&names, &limbs),
            Err(TopologyError::Cycle(_))
        ));
    }

    #[test]
    fn test_unknown_and_duplicate_names() {
        assert_eq!(
            SkeletonTopology::new(&["a", "a"], &[]),
            Err(TopologyError::DuplicateName("a".into()))
        );
        assert_eq!(
            SkeletonTopology::new(&["a"], &[("a", "z")]),
            Err(TopologyError::UnknownKeypoint("z".into()))
        );
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let topo = SkeletonTopology::coco17();
        let json = serde_json::to_string(&topo).unwrap();
        let back: SkeletonTopology = serde_json::from_str(&json).unwrap();
        assert_eq!(back, topo);

        let bad = r#"{"keypoints":["a","b"],"limbs":[["a","b"],["b","a"]]}"#;
        assert!(serde_json::from_str::<SkeletonTopology>(bad).is_err());
    }
}
