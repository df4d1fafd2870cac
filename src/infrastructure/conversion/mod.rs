mod zhconv_converter;

pub use zhconv_converter::ZhconvConverter;
