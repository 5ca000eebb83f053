//! Square footprint of a quadtree node in the XZ plane.

use glam::Vec2;

/// Axis-aligned square, `origin` is the minimum corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect2 {
	/// Minimum corner (inclusive).
	pub origin: Vec2,
	/// Side length.
	pub size: f32,
}

impl Rect2 {
	pub fn new(origin: Vec2, size: f32) -> Self {
		debug_assert!(size >= 0.0, "Rect2 size must be non-negative");
		Self { origin, size }
	}

	#[inline]
	pub fn center(&self) -> Vec2 {
		self.origin + Vec2::splat(self.size * 0.5)
	}

	/// Maximum corner (inclusive).
	#[inline]
	pub fn max(&self) -> Vec2 {
		self.origin + Vec2::splat(self.size)
	}

	/// Check if the square contains a point (edges inclusive).
	#[inline]
	pub fn contains(&self, point: Vec2) -> bool {
		let max = self.max();
		point.x >= self.origin.x && point.x <= max.x && point.y >= self.origin.y && point.y <= max.y
	}

	/// Quadrant index of `point`, matching [`Rect2::quadrant_rect`].
	///
	/// ```text
	///   z
	///   │  2 │ 3
	///   │ ───┼───
	///   │  0 │ 1
	///   └────────── x
	/// ```
	///
	/// Points on the center lines go to the higher quadrant. Points outside
	/// the square are assigned to the nearest one.
	#[inline]
	pub fn quadrant(&self, point: Vec2) -> usize {
		let center = self.center();
		let ix = (point.x >= center.x) as usize;
		let iz = (point.y >= center.y) as usize;
		ix | (iz << 1)
	}

	/// One of the four half-size sub-squares.
	#[inline]
	pub fn quadrant_rect(&self, index: usize) -> Rect2 {
		let half = self.size * 0.5;
		let offset = Vec2::new((index & 1) as f32 * half, ((index >> 1) & 1) as f32 * half);
		Rect2::new(self.origin + offset, half)
	}
}
