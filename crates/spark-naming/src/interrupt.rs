//! # 线程中断标记
//!
//! ## 角色定位（Why）
//! - 命名操作在调用线程上同步执行，会话获取可能长时间阻塞；其它线程需要一种方式请求
//!   该线程放弃等待，并在放弃后仍能观察到"曾被中断"；
//! - 标准库线程没有中断标记，本模块为每个线程提供一个。
//!
//! ## 契约说明（What）
//! - 每个线程拥有独立的标记，[`InterruptHandle::current`] 取得当前线程的句柄，句柄可跨线程传递；
//! - [`InterruptHandle::interrupt`] 置位标记，并唤醒当前登记的阻塞者（若有）；
//! - [`is_interrupted`] 只读，[`take_interrupt`] 读取并清除；
//! - 阻塞原语通过 [`InterruptHandle::on_interrupt`] 在等待期间登记唤醒回调，守卫释放时撤销登记。
//!
//! ## 风险提示（Trade-offs）
//! - 唤醒回调在持有内部锁之外执行，回调可能在守卫释放后仍被调用一次，阻塞原语须容忍伪唤醒。

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;

type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct InterruptState {
    flag: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState::default());
}

/// 某个线程中断标记的句柄。
#[derive(Clone)]
pub struct InterruptHandle {
    state: Arc<InterruptState>,
}

impl InterruptHandle {
    /// 当前线程的句柄。
    pub fn current() -> Self {
        CURRENT.with(|state| Self {
            state: Arc::clone(state),
        })
    }

    /// 置位中断标记并唤醒登记的阻塞者。
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::Release);
        // 先复制回调再释放锁，回调内部可能重新获取等待方的锁。
        let waker = self.state.waker.lock().clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::Acquire)
    }

    /// 登记唤醒回调，直到返回的守卫被释放。
    ///
    /// 嵌套登记时，内层守卫释放后恢复外层回调。
    #[must_use = "the waker is unregistered as soon as the guard is dropped"]
    pub fn on_interrupt(&self, waker: impl Fn() + Send + Sync + 'static) -> InterruptRegistration {
        let previous = self.state.waker.lock().replace(Arc::new(waker));
        InterruptRegistration {
            state: Arc::clone(&self.state),
            previous,
        }
    }

    fn take(&self) -> bool {
        self.state.flag.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// [`InterruptHandle::on_interrupt`] 返回的登记守卫。
pub struct InterruptRegistration {
    state: Arc<InterruptState>,
    previous: Option<Waker>,
}

impl Drop for InterruptRegistration {
    fn drop(&mut self) {
        *self.state.waker.lock() = self.previous.take();
    }
}

/// 当前线程是否处于中断状态，不清除标记。
pub fn is_interrupted() -> bool {
    InterruptHandle::current().is_interrupted()
}

/// 读取并清除当前线程的中断标记。
pub fn take_interrupt() -> bool {
    InterruptHandle::current().take()
}
