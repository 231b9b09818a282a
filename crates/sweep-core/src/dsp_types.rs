pub type RealSample = f32;
pub type ComplexSample = num_complex::Complex<RealSample>;
pub type SampleCount = i64;
