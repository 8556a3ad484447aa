#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod kernel {
    extern crate rlibc;

    use core::arch::global_asm;
    use core::panic::PanicInfo;

    use nanosys::arch::entry::{entry_points, KernelInterrupts, SYSTEM};
    use nanosys::arch::x86::X86;
    use nanosys::arch::Cpu;
    use nanosys::core::kernel::{init_interrupts, init_phase, register_component};
    use nanosys::console::Console;
    use nanosys::devices::input::InputQueue;
    use nanosys::serial::{self, SERIAL};
    use nanosys::{log_error, log_info, println, BootConfig};

    const INTERRUPT_SYSTEM: &str = "Interrupt System";

    // Multiboot v1 header, boot stack and a flat GDT. GRUB leaves us in
    // protected mode with its own segments, so reload ours before any gate
    // can reference selector 0x08.
    global_asm!(
        r#"
        .section .multiboot, "a"
        .align 4
        .long 0x1BADB002
        .long 0x00000003
        .long -(0x1BADB002 + 0x00000003)

        .section .bss
        .align 16
        boot_stack_bottom:
        .skip 16384
        boot_stack_top:

        .section .rodata
        .align 8
        boot_gdt:
        .quad 0
        .quad 0x00CF9A000000FFFF
        .quad 0x00CF92000000FFFF
        boot_gdt_end:
        boot_gdt_pointer:
        .word boot_gdt_end - boot_gdt - 1
        .long boot_gdt

        .section .text
        .global _start
        _start:
            mov esp, offset boot_stack_top
            lgdt [boot_gdt_pointer]
            push 0x08
            mov eax, offset .Lreload_segments
            push eax
            retf
        .Lreload_segments:
            mov ax, 0x10
            mov ds, ax
            mov es, ax
            mov fs, ax
            mov gs, ax
            mov ss, ax
            call kernel_main
        .Lhang:
            cli
            hlt
            jmp .Lhang
        "#
    );

    #[no_mangle]
    pub extern "C" fn kernel_main() -> ! {
        serial::init();
        println!("=====================================");
        println!("   NanoSys kernel booting");
        println!("=====================================");

        register_component(INTERRUPT_SYSTEM);
        let system: &'static KernelInterrupts = match init_phase(INTERRUPT_SYSTEM, || {
            init_interrupts(&SYSTEM, X86, InputQueue::new(), BootConfig::DEFAULT, entry_points()?)
        }) {
            Ok(system) => system,
            Err(e) => {
                log_error!("Kernel initialization failed: {}", e);
                halt_forever();
            }
        };

        log_info!("System uptime: {}", system.timer().uptime());
        println!("NanoSys kernel running!");

        let mut console = Console::new();
        let _ = console.start(&mut *SERIAL.lock());
        loop {
            if let Some(character) = system.sink().pop_or_halt(&X86) {
                let _ = console.feed(character, system.timer(), &mut *SERIAL.lock());
            }
        }
    }

    fn halt_forever() -> ! {
        loop {
            X86.disable_interrupts();
            X86.halt();
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        println!("PANIC : {} | {:?}", info.message(), info.location());
        halt_forever()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("the kernel only runs on bare metal; build it for the i686-nanosys target");
}
