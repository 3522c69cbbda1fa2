//! Elementwise and matrix-multiply primitives used by the decompositions.

pub mod array;
pub mod matmul;

pub use array::{
    add_arrays, add_vector_to_scaled_vector, conjugate_array, dot_product, matrix_norm,
    pointwise_divide, pointwise_multiply, pointwise_power, scale_array, subtract_arrays, Norm,
};
pub use matmul::{matrix_multiply, matrix_multiply_with_update, Transpose};
