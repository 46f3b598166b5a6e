//! WebGL2 backend
//!
//! Owns one `<canvas>` appended to the host container and the `webgl2`
//! context on it. Every call guards on the context still being present so a
//! released backend is inert.

use js_sys::{Object, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, HtmlElement, Node, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram,
    WebGlShader, WebGlUniformLocation, WebglLoseContext,
};

use super::shader::{uniforms, Attribute, FrameUniforms};
use super::{AttributeBuffers, RenderBackend};
use crate::core::camera::OutputSize;
use crate::error::{InitError, ShaderStage};
use crate::theme::colors;

pub struct GlBuffer {
    buffer: WebGlBuffer,
    attribute: Attribute,
}

pub struct GlProgram {
    program: WebGlProgram,
    model_view: Option<WebGlUniformLocation>,
    projection: Option<WebGlUniformLocation>,
    time: Option<WebGlUniformLocation>,
    point_scale: Option<WebGlUniformLocation>,
}

pub struct WebGlBackend {
    container: HtmlElement,
    canvas: Option<HtmlCanvasElement>,
    gl: Option<Gl>,
}

impl WebGlBackend {
    /// Create the canvas inside `container` and open a `webgl2` context on it.
    ///
    /// The canvas is removed again if no context can be obtained.
    pub fn acquire(container: &HtmlElement, output: OutputSize) -> Result<Self, InitError> {
        let document = container
            .owner_document()
            .ok_or_else(|| InitError::Surface("container is not attached to a document".into()))?;

        let canvas = document
            .create_element("canvas")
            .map_err(|e| InitError::Surface(format!("{:?}", e)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| InitError::Surface("created element is not a canvas".into()))?;

        style_canvas(&canvas);
        canvas.set_width(output.width.max(1));
        canvas.set_height(output.height.max(1));

        container
            .append_child(&canvas)
            .map_err(|e| InitError::Surface(format!("{:?}", e)))?;

        match open_context(&canvas) {
            Ok(gl) => {
                gl.disable(Gl::DEPTH_TEST);
                gl.depth_mask(false);
                gl.enable(Gl::BLEND);
                gl.blend_func(Gl::SRC_ALPHA, Gl::ONE);
                debug!("WebGL2 context acquired");
                Ok(Self {
                    container: container.clone(),
                    canvas: Some(canvas),
                    gl: Some(gl),
                })
            }
            Err(e) => {
                detach(container, &canvas);
                Err(e)
            }
        }
    }
}

fn style_canvas(canvas: &HtmlCanvasElement) {
    let style = canvas.style();
    let opacity = colors::SURFACE_OPACITY.to_string();
    let properties = [
        ("position", "absolute"),
        ("top", "0"),
        ("left", "0"),
        ("width", "100%"),
        ("height", "100%"),
        ("pointer-events", "none"),
        ("opacity", opacity.as_str()),
    ];
    for (name, value) in properties {
        if let Err(e) = style.set_property(name, value) {
            warn!(property = name, ?e, "Failed to style canvas");
        }
    }
}

fn open_context(canvas: &HtmlCanvasElement) -> Result<Gl, InitError> {
    let options = Object::new();
    let entries = [
        ("alpha", JsValue::TRUE),
        ("antialias", JsValue::FALSE),
        ("powerPreference", JsValue::from_str("high-performance")),
    ];
    for (key, value) in entries {
        // Only fails on frozen objects
        let _ = Reflect::set(&options, &JsValue::from_str(key), &value);
    }

    canvas
        .get_context_with_context_options("webgl2", &options)
        .map_err(|e| InitError::BackendUnavailable(format!("{:?}", e)))?
        .ok_or_else(|| InitError::BackendUnavailable("webgl2 not supported".into()))?
        .dyn_into::<Gl>()
        .map_err(|_| InitError::BackendUnavailable("unexpected context type".into()))
}

fn detach(container: &HtmlElement, canvas: &HtmlCanvasElement) {
    let node: &Node = canvas;
    if container.contains(Some(node)) {
        if let Err(e) = container.remove_child(canvas) {
            warn!(?e, "Failed to detach canvas");
        }
    }
}

fn compile_shader(gl: &Gl, stage: ShaderStage, source: &str) -> Result<WebGlShader, InitError> {
    let kind = match stage {
        ShaderStage::Vertex => Gl::VERTEX_SHADER,
        ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
    };
    let shader = gl.create_shader(kind).ok_or_else(|| InitError::ShaderCompile {
        stage,
        log: "unable to create shader object".into(),
    })?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let compiled = gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if compiled {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(InitError::ShaderCompile { stage, log })
    }
}

impl RenderBackend for WebGlBackend {
    type Buffer = GlBuffer;
    type Program = GlProgram;

    fn create_buffer(&mut self, attribute: Attribute, data: &[f32]) -> Result<GlBuffer, InitError> {
        let gl = self
            .gl
            .as_ref()
            .ok_or(InitError::BufferAllocation(attribute.label()))?;
        let buffer = gl
            .create_buffer()
            .ok_or(InitError::BufferAllocation(attribute.label()))?;

        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        gl.buffer_data_with_u8_array(Gl::ARRAY_BUFFER, bytemuck::cast_slice(data), Gl::STATIC_DRAW);
        gl.bind_buffer(Gl::ARRAY_BUFFER, None);

        Ok(GlBuffer { buffer, attribute })
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<GlProgram, InitError> {
        let gl = self
            .gl
            .as_ref()
            .ok_or_else(|| InitError::ProgramLink("context released".into()))?;

        let vs = compile_shader(gl, ShaderStage::Vertex, vertex)?;
        let fs = match compile_shader(gl, ShaderStage::Fragment, fragment) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(Some(&vs));
                return Err(e);
            }
        };

        let program = match gl.create_program() {
            Some(program) => program,
            None => {
                gl.delete_shader(Some(&vs));
                gl.delete_shader(Some(&fs));
                return Err(InitError::ProgramLink("unable to create program object".into()));
            }
        };
        gl.attach_shader(&program, &vs);
        gl.attach_shader(&program, &fs);
        gl.link_program(&program);

        // Shaders are no longer needed once linked (or failed)
        gl.detach_shader(&program, &vs);
        gl.detach_shader(&program, &fs);
        gl.delete_shader(Some(&vs));
        gl.delete_shader(Some(&fs));

        let linked = gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if !linked {
            let log = gl.get_program_info_log(&program).unwrap_or_default();
            gl.delete_program(Some(&program));
            return Err(InitError::ProgramLink(log));
        }

        Ok(GlProgram {
            model_view: gl.get_uniform_location(&program, uniforms::MODEL_VIEW),
            projection: gl.get_uniform_location(&program, uniforms::PROJECTION),
            time: gl.get_uniform_location(&program, uniforms::TIME),
            point_scale: gl.get_uniform_location(&program, uniforms::POINT_SCALE),
            program,
        })
    }

    fn set_output_size(&mut self, size: OutputSize) {
        let (Some(gl), Some(canvas)) = (self.gl.as_ref(), self.canvas.as_ref()) else {
            return;
        };
        let width = size.width.max(1);
        let height = size.height.max(1);
        canvas.set_width(width);
        canvas.set_height(height);
        gl.viewport(0, 0, width as i32, height as i32);
    }

    fn is_context_lost(&self) -> bool {
        self.gl.as_ref().map_or(true, |gl| gl.is_context_lost())
    }

    fn draw_points(
        &mut self,
        program: &GlProgram,
        buffers: &AttributeBuffers<GlBuffer>,
        frame: &FrameUniforms,
        count: usize,
    ) {
        let Some(gl) = self.gl.as_ref() else {
            return;
        };

        let [r, g, b, a] = colors::CLEAR;
        gl.clear_color(r, g, b, a);
        gl.clear(Gl::COLOR_BUFFER_BIT);
        if count == 0 {
            return;
        }

        gl.use_program(Some(&program.program));
        gl.uniform_matrix4fv_with_f32_array(program.model_view.as_ref(), false, frame.model_view_data());
        gl.uniform_matrix4fv_with_f32_array(program.projection.as_ref(), false, frame.projection_data());
        gl.uniform1f(program.time.as_ref(), frame.time);
        gl.uniform1f(program.point_scale.as_ref(), frame.point_scale);

        for buffer in [&buffers.position, &buffers.color, &buffers.size] {
            let location = buffer.attribute.location();
            gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer.buffer));
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_with_i32(location, buffer.attribute.components(), Gl::FLOAT, false, 0, 0);
        }

        gl.draw_arrays(Gl::POINTS, 0, count as i32);
    }

    fn delete_buffer(&mut self, buffer: GlBuffer) {
        if let Some(gl) = self.gl.as_ref() {
            gl.delete_buffer(Some(&buffer.buffer));
        }
    }

    fn delete_program(&mut self, program: GlProgram) {
        if let Some(gl) = self.gl.as_ref() {
            gl.delete_program(Some(&program.program));
        }
    }

    fn release(&mut self) {
        if let Some(gl) = self.gl.take() {
            // Free the context now, not at GC
            if let Ok(Some(ext)) = gl.get_extension("WEBGL_lose_context") {
                if let Ok(ext) = ext.dyn_into::<WebglLoseContext>() {
                    ext.lose_context();
                }
            }
        }
        if let Some(canvas) = self.canvas.take() {
            detach(&self.container, &canvas);
        }
        debug!("WebGL2 backend released");
    }
}

impl Drop for WebGlBackend {
    fn drop(&mut self) {
        self.release();
    }
}
