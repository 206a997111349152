pub mod camera;
pub mod texture;

pub use camera::Camera;

pub use texture::{
    Colormap, NO_TEXTURE, Palette, ShadeProvider, Texture, TextureBank, TextureError, TextureId,
    TextureProvider,
};
