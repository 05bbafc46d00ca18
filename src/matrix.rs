//! Dense 2-D matrices and small geometry primitives
//!
//! The pipeline works on row-major matrices of pixels, gradients and
//! energies. [`Matrix`] owns its backing storage; [`MatrixView`] and
//! [`MatrixViewMut`] borrow a rectangular window of it without copying, so
//! writes through a mutable view land directly in the parent.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub};

/// Conversion used when cloning a matrix into a different element type.
/// Float sources are rounded to the nearest integer, not truncated.
pub trait RoundFrom<T> {
    fn round_from(value: T) -> Self;
}

impl RoundFrom<f64> for u8 {
    fn round_from(value: f64) -> Self {
        (value + 0.5).floor() as u8
    }
}

impl RoundFrom<f64> for i32 {
    fn round_from(value: f64) -> Self {
        (value + 0.5).floor() as i32
    }
}

impl RoundFrom<i32> for f64 {
    fn round_from(value: i32) -> Self {
        value as f64
    }
}

impl RoundFrom<u8> for i32 {
    fn round_from(value: u8) -> Self {
        value as i32
    }
}

impl RoundFrom<u8> for f64 {
    fn round_from(value: u8) -> Self {
        value as f64
    }
}

/// Row-major 2-D array with contiguous backing storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Create a matrix filled with the element default.
    pub fn new(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Create a matrix by evaluating `f(row, col)` for every element.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Matrix { rows, cols, data }
    }

    /// Wrap an existing row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), rows * cols);
        Matrix { rows, cols, data }
    }

    /// Resize in place, zeroing the contents. Keeps the allocation when the
    /// new shape is not larger, so scratch matrices do not churn.
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, T::default());
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Clone into a matrix of a different element type.
    pub fn cast<U: Copy + RoundFrom<T>>(&self) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| U::round_from(v)).collect(),
        }
    }
}

impl<T> Matrix<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> &T {
        debug_assert!(row < self.rows && col < self.cols);
        &self.data[row * self.cols + col]
    }

    #[inline]
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut T {
        debug_assert!(row < self.rows && col < self.cols);
        &mut self.data[row * self.cols + col]
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Borrow the rectangle at `(x, y)` of size `w × h`.
    pub fn view(&self, x: usize, y: usize, w: usize, h: usize) -> MatrixView<'_, T> {
        assert!(x + w <= self.cols && y + h <= self.rows);
        MatrixView {
            parent: self,
            x,
            y,
            w,
            h,
        }
    }

    /// Mutably borrow the rectangle at `(x, y)` of size `w × h`. Writes are
    /// visible through the parent once the view is dropped.
    pub fn view_mut(&mut self, x: usize, y: usize, w: usize, h: usize) -> MatrixViewMut<'_, T> {
        assert!(x + w <= self.cols && y + h <= self.rows);
        MatrixViewMut {
            parent: self,
            x,
            y,
            w,
            h,
        }
    }
}

/// Shared window into a [`Matrix`].
pub struct MatrixView<'a, T> {
    parent: &'a Matrix<T>,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

impl<T> MatrixView<'_, T> {
    pub fn rows(&self) -> usize {
        self.h
    }

    pub fn cols(&self) -> usize {
        self.w
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> &T {
        debug_assert!(row < self.h && col < self.w);
        self.parent.at(self.y + row, self.x + col)
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        &self.parent.row(self.y + row)[self.x..self.x + self.w]
    }
}

/// Mutable window into a [`Matrix`].
pub struct MatrixViewMut<'a, T> {
    parent: &'a mut Matrix<T>,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

impl<T> MatrixViewMut<'_, T> {
    pub fn rows(&self) -> usize {
        self.h
    }

    pub fn cols(&self) -> usize {
        self.w
    }

    #[inline]
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut T {
        debug_assert!(row < self.h && col < self.w);
        self.parent.at_mut(self.y + row, self.x + col)
    }

    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = self.x;
        let end = self.x + self.w;
        &mut self.parent.row_mut(self.y + row)[start..end]
    }
}

impl<T: Copy> MatrixViewMut<'_, T> {
    pub fn fill(&mut self, value: T) {
        for row in 0..self.h {
            self.row_mut(row).fill(value);
        }
    }
}

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// Euclidean length. Kernel evaluators and geometric callers must agree
    /// bit-for-bit, so both go through this one function.
    pub fn norm(self) -> f64 {
        ((self.x as f64) * (self.x as f64) + (self.y as f64) * (self.y as f64)).sqrt()
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).norm()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<i32> for Point {
    type Output = Point;
    fn mul(self, rhs: i32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Continuous coordinate used when stepping along a scan ray.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        PointF { x, y }
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Component-wise floor to the containing pixel.
    pub fn floor(self) -> Point {
        Point::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl From<Point> for PointF {
    fn from(p: Point) -> Self {
        PointF::new(p.x as f64, p.y as f64)
    }
}

impl Add for PointF {
    type Output = PointF;
    fn add(self, rhs: PointF) -> PointF {
        PointF::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for PointF {
    fn add_assign(&mut self, rhs: PointF) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for PointF {
    type Output = PointF;
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for PointF {
    type Output = PointF;
    fn mul(self, rhs: f64) -> PointF {
        PointF::new(self.x * rhs, self.y * rhs)
    }
}

impl MulAssign<f64> for PointF {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}
