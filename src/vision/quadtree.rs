use vek::Vec2;

use crate::vision::obstacle::ObstacleId;

/// 四叉樹節點
#[derive(Debug, Clone)]
pub struct QuadTreeNode {
    /// 節點邊界
    pub bounds: Bounds,
    /// 子節點（NW, NE, SW, SE）
    pub children: Option<Box<[QuadTreeNode; 4]>>,
    /// 與此節點相交的障礙物
    pub items: Vec<(ObstacleId, Bounds)>,
    /// 節點深度
    pub depth: usize,
}

/// 水平面上的邊界矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2<f32>,
    pub max: Vec2<f32>,
}

impl Bounds {
    pub fn new(min: Vec2<f32>, max: Vec2<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points(a: Vec2<f32>, b: Vec2<f32>) -> Self {
        Self {
            min: Vec2::partial_min(a, b),
            max: Vec2::partial_max(a, b),
        }
    }

    pub fn around(center: Vec2<f32>, half_extent: Vec2<f32>) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn contains_point(&self, point: Vec2<f32>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: Vec2::partial_min(self.min, other.min),
            max: Vec2::partial_max(self.max, other.max),
        }
    }

    pub fn expand(&self, margin: f32) -> Bounds {
        Bounds {
            min: self.min - Vec2::broadcast(margin),
            max: self.max + Vec2::broadcast(margin),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// 障礙物的空間索引
#[derive(Debug, Clone)]
pub struct QuadTree {
    pub root: Option<QuadTreeNode>,
    pub max_tree_depth: usize,
    pub max_items_per_node: usize,
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::new(6, 8)
    }
}

impl QuadTree {
    pub fn new(max_tree_depth: usize, max_items_per_node: usize) -> Self {
        Self {
            root: None,
            max_tree_depth,
            max_items_per_node: max_items_per_node.max(1),
        }
    }

    /// 依據障礙物的邊界重建整棵樹，世界範圍自動計算
    pub fn rebuild(&mut self, items: Vec<(ObstacleId, Bounds)>) {
        let world = items
            .iter()
            .map(|(_, b)| *b)
            .reduce(|acc, b| acc.union(&b));

        self.root = world.map(|world| {
            let mut root = QuadTreeNode {
                bounds: world.expand(1.0),
                children: None,
                items,
                depth: 0,
            };
            self.subdivide_node(&mut root);
            root
        });
    }

    /// 遞歸細分節點
    fn subdivide_node(&self, node: &mut QuadTreeNode) {
        if node.items.len() <= self.max_items_per_node ||
           node.depth >= self.max_tree_depth {
            return;
        }

        let bounds = node.bounds;
        let mid_x = (bounds.min.x + bounds.max.x) * 0.5;
        let mid_y = (bounds.min.y + bounds.max.y) * 0.5;
        let child = |min: Vec2<f32>, max: Vec2<f32>| QuadTreeNode {
            bounds: Bounds::new(min, max),
            children: None,
            items: Vec::new(),
            depth: node.depth + 1,
        };

        let mut children = Box::new([
            // 西北
            child(Vec2::new(bounds.min.x, mid_y), Vec2::new(mid_x, bounds.max.y)),
            // 東北
            child(Vec2::new(mid_x, mid_y), bounds.max),
            // 西南
            child(bounds.min, Vec2::new(mid_x, mid_y)),
            // 東南
            child(Vec2::new(mid_x, bounds.min.y), Vec2::new(bounds.max.x, mid_y)),
        ]);

        // 將障礙物分配到子節點
        for (id, item_bounds) in node.items.drain(..) {
            for child in children.iter_mut() {
                if item_bounds.intersects(&child.bounds) {
                    child.items.push((id, item_bounds));
                }
            }
        }

        for child in children.iter_mut() {
            self.subdivide_node(child);
        }
        node.children = Some(children);
    }

    /// 查詢與範圍相交的障礙物，結果已排序且不重複
    pub fn query(&self, area: &Bounds) -> Vec<ObstacleId> {
        let mut results = Vec::new();
        if let Some(ref root) = self.root {
            Self::query_node_recursive(root, area, &mut results);
        }
        results.sort_unstable();
        results.dedup();
        results
    }

    /// 遞歸查詢節點
    fn query_node_recursive(node: &QuadTreeNode, area: &Bounds, results: &mut Vec<ObstacleId>) {
        if !node.bounds.intersects(area) {
            return;
        }

        results.extend(
            node.items
                .iter()
                .filter(|(_, b)| b.intersects(area))
                .map(|(id, _)| *id),
        );

        if let Some(ref children) = node.children {
            for child in children.iter() {
                Self::query_node_recursive(child, area, results);
            }
        }
    }

    /// 計算四叉樹節點數量
    pub fn count_nodes(&self) -> usize {
        self.root.as_ref().map_or(0, Self::count_nodes_recursive)
    }

    fn count_nodes_recursive(node: &QuadTreeNode) -> usize {
        1 + node
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(Self::count_nodes_recursive).sum())
    }
}
